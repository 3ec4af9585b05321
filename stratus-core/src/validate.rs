//! Validate - Reusable predicate validators
//!
//! Pure functions with no side effects. Invalid input simply yields `false`
//! from the `is_*` predicates (or `true` from the `*_invalid` ones); nothing
//! here panics or returns an error for malformed values.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::context::{SaveContext, siblings};
use crate::document::{ResourceExt, is_blank_value, value_as_number};
use crate::kind::{NameRule, ResourceKind};

/// Maximum length of a resource name
pub const MAX_NAME_LEN: usize = 63;

/// Maximum length of the deployment prefix
pub const MAX_PREFIX_LEN: usize = 16;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z](?:[a-z0-9-]*[a-z0-9])?$").unwrap());

static CRN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^crn:v\d:[a-z0-9-]+:[a-z0-9-]+:[a-z0-9-]+:[a-z0-9-]*:[a-zA-Z0-9/-]*:[a-zA-Z0-9-]*:[a-zA-Z0-9-]*:[a-zA-Z0-9-]*$")
        .unwrap()
});

static SSH_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(ssh-rsa|ssh-ed25519) AAAA[0-9A-Za-z+/]+={0,3}( \S+)?$").unwrap()
});

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$").unwrap()
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://[a-z0-9.-]+(?::\d+)?(?:/\S*)?$").unwrap());

/// Name syntax shown to users in messages
pub const NAME_PATTERN: &str = "^[a-z](?:[a-z0-9-]*[a-z0-9])?$";

// ========== Names ==========

/// Lowercase letter first, then letters/digits/hyphens, no trailing hyphen,
/// at most [`MAX_NAME_LEN`] characters
pub fn is_valid_name(name: &str) -> bool {
    is_valid_name_len(name, MAX_NAME_LEN)
}

pub fn is_valid_name_len(name: &str, max_len: usize) -> bool {
    !name.is_empty() && name.len() <= max_len && NAME_RE.is_match(name)
}

/// Deployment prefix: name syntax, at most 16 characters
pub fn is_valid_prefix(prefix: &str) -> bool {
    is_valid_name_len(prefix, MAX_PREFIX_LEN)
}

/// Name syntax check according to a kind's [`NameRule`]
pub fn is_valid_name_for(kind: ResourceKind, name: &str) -> bool {
    match kind.name_rule() {
        NameRule::Standard { max_len } => is_valid_name_len(name, max_len),
        NameRule::Free => !name.trim().is_empty(),
        NameRule::Domain => is_domain(name),
        NameRule::None => true,
    }
}

/// True iff another resource in the candidate's scope already uses `name`.
/// The resource currently being edited (by its original name) is ignored.
pub fn has_duplicate_name(kind: ResourceKind, name: &str, ctx: &SaveContext<'_>) -> bool {
    let editing = ctx.scope.editing();
    siblings(ctx.doc, kind, &ctx.scope)
        .iter()
        .any(|r| r.name() == name && Some(r.name()) != editing)
}

// ========== IP addresses and CIDR blocks ==========

/// Strict dotted-quad IPv4 address (no prefix)
pub fn is_ip(value: &str) -> bool {
    !value.contains('/') && value.parse::<Ipv4Addr>().is_ok()
}

/// Parse `a.b.c.d/n`, prefix in 0..=32
pub fn parse_cidr(value: &str) -> Option<(Ipv4Addr, u8)> {
    let (ip, prefix) = value.split_once('/')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let prefix = prefix.parse::<u8>().ok().filter(|p| *p <= 32)?;
    let ip = ip.parse::<Ipv4Addr>().ok()?;
    Some((ip, prefix))
}

/// CIDR block; a bare IP is not a CIDR
pub fn is_cidr(value: &str) -> bool {
    parse_cidr(value).is_some()
}

pub fn is_ip_or_cidr(value: &str) -> bool {
    is_ip(value) || is_cidr(value)
}

/// Comma separated list of IP addresses
pub fn is_ip_list(value: &str) -> bool {
    is_list_of(value, is_ip)
}

fn is_list_of(value: &str, item: fn(&str) -> bool) -> bool {
    !value.trim().is_empty() && value.split(',').map(str::trim).all(item)
}

/// Network address range `[first, last]` covered by a CIDR block
pub fn cidr_range(value: &str) -> Option<(u32, u32)> {
    let (ip, prefix) = parse_cidr(value)?;
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    let first = u32::from(ip) & mask;
    Some((first, first | !mask))
}

/// True when two CIDR blocks share at least one address
pub fn cidrs_overlap(a: &str, b: &str) -> bool {
    match (cidr_range(a), cidr_range(b)) {
        (Some((a_first, a_last)), Some((b_first, b_last))) => {
            a_first <= b_last && b_first <= a_last
        }
        _ => false,
    }
}

// ========== Numbers ==========

/// Integer value of a number or numeric string; `None` for fractions
pub fn whole_number(value: &Value) -> Option<i64> {
    let n = value_as_number(value)?;
    if n.fract() == 0.0 && n.is_finite() {
        Some(n as i64)
    } else {
        None
    }
}

/// Whole number within `[min, max]`
pub fn is_in_range(value: &Value, min: i64, max: i64) -> bool {
    whole_number(value).is_some_and(|n| (min..=max).contains(&n))
}

/// Optional whole-number field: blank is accepted, anything else must be a
/// whole number in `[min, max]`
pub fn is_range_invalid(value: Option<&Value>, min: i64, max: i64) -> bool {
    match value {
        v if is_blank_value(v) => false,
        Some(v) => !is_in_range(v, min, max),
        None => false,
    }
}

/// Required whole-number field: blank is rejected
pub fn is_required_range_invalid(value: Option<&Value>, min: i64, max: i64) -> bool {
    value.is_none_or(|v| !is_in_range(v, min, max))
}

// ========== Lists and formats ==========

/// Cloud resource name (ten colon separated segments)
pub fn is_crn(value: &str) -> bool {
    CRN_RE.is_match(value)
}

/// A single tag: name alphabet, up to 128 characters
pub fn is_tag(tag: &str) -> bool {
    is_valid_name_len(tag, 128)
}

pub fn is_tag_list(tags: &[&str]) -> bool {
    tags.iter().all(|t| is_tag(t))
}

/// OpenSSH public key (`ssh-rsa` or `ssh-ed25519`)
pub fn is_ssh_public_key(value: &str) -> bool {
    SSH_KEY_RE.is_match(value.trim())
}

/// Fully qualified domain name
pub fn is_domain(value: &str) -> bool {
    value.len() <= 253 && DOMAIN_RE.is_match(value)
}

pub fn is_https_url(value: &str) -> bool {
    URL_RE.is_match(value)
}
