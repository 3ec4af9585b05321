//! Cloud-specific value lists shared by several schemas
//!
//! Region, zone and datacenter lists are kept verbatim; form options and
//! validation both read from here.

/// VPC regions
pub const REGIONS: &[&str] = &[
    "us-south", "us-east", "eu-de", "eu-gb", "eu-es", "jp-tok", "jp-osa", "au-syd", "ca-tor",
    "br-sao",
];

/// Power VS zones available in each region
pub const POWER_ZONES: &[(&str, &[&str])] = &[
    ("au-syd", &["syd04", "syd05"]),
    ("br-sao", &["sao01", "sao04"]),
    ("ca-tor", &["tor01"]),
    ("eu-de", &["eu-de-1", "eu-de-2"]),
    ("eu-es", &["mad02", "mad04"]),
    ("eu-gb", &["lon04", "lon06"]),
    ("jp-osa", &["osa21"]),
    ("jp-tok", &["tok04"]),
    ("us-east", &["us-east", "wdc06", "wdc07"]),
    ("us-south", &["us-south", "dal10", "dal12"]),
];

/// Power VS zones that support high availability replication
pub const POWER_HA_ZONES: &[&str] = &["dal10", "dal12", "wdc06", "wdc07", "eu-de-1", "eu-de-2", "lon04", "lon06"];

/// Classic infrastructure datacenters
pub const CLASSIC_DATACENTERS: &[&str] = &[
    "ams03", "che01", "dal10", "dal12", "dal13", "fra02", "fra04", "fra05", "lon02", "lon04",
    "lon05", "lon06", "mad02", "mad04", "mad05", "mon01", "osa21", "osa22", "osa23", "par01",
    "sao01", "sjc03", "sjc04", "sng01", "syd01", "syd04", "syd05", "tok02", "tok04", "tok05",
    "tor01", "tor04", "tor05", "wdc04", "wdc06", "wdc07",
];

/// Endpoint types
pub const ENDPOINTS: &[&str] = &["private", "public", "public-and-private"];

pub const ACL_ACTIONS: &[&str] = &["allow", "deny"];

pub const DIRECTIONS: &[&str] = &["inbound", "outbound"];

pub const PROTOCOLS: &[&str] = &["all", "tcp", "udp", "icmp"];

pub const COS_STORAGE_CLASSES: &[&str] = &["standard", "vault", "cold", "smart"];

pub const COS_ROLES: &[&str] = &["Writer", "Reader", "Manager", "Content Reader", "Object Reader", "Object Writer"];

pub const CLUSTER_TYPES: &[&str] = &["openshift", "iks"];

pub const LB_ALGORITHMS: &[&str] = &["round_robin", "weighted_round_robin", "least_connections"];

pub const LB_PROTOCOLS: &[&str] = &["http", "https", "tcp", "udp"];

pub const LB_HEALTH_PROTOCOLS: &[&str] = &["http", "https", "tcp"];

pub const VPN_SERVER_METHODS: &[&str] = &["certificate", "byo", "INSECURE - Developer Certificate"];

pub const VPN_SERVER_PROTOCOLS: &[&str] = &["udp", "tcp"];

pub const ROUTE_ACTIONS: &[&str] = &["delegate", "deliver", "delegate_vpc", "drop"];

pub const EVENT_STREAMS_PLANS: &[&str] = &["lite", "standard", "enterprise"];

pub const EVENT_STREAMS_THROUGHPUT: &[&str] = &["150MB/s", "300MB/s", "450MB/s"];

pub const EVENT_STREAMS_STORAGE: &[&str] = &["2TB", "4TB", "6TB", "8TB", "10TB", "12TB"];

pub const DNS_PLANS: &[&str] = &["standard", "free"];

pub const DNS_RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME", "MX", "PTR", "SRV", "TXT"];

pub const CBR_ADDRESS_TYPES: &[&str] = &["ipAddress", "ipRange", "subnet", "vpc", "serviceRef"];

pub const CBR_ENFORCEMENT_MODES: &[&str] = &["enabled", "disabled", "report"];

pub const CBR_CONTEXT_NAMES: &[&str] = &["networkZoneId", "endpointType", "mfa"];

pub const CBR_OPERATORS: &[&str] = &["stringEquals", "stringMatch"];

pub const MFA_OPTIONS: &[&str] = &["NONE", "TOTP", "TOTP4ALL", "LEVEL1", "LEVEL2", "LEVEL3"];

pub const RESTRICT_SERVICE_ID: &[&str] = &["RESTRICTED", "NOT_RESTRICTED", "NOT_SET"];

pub const ICD_SERVICES: &[&str] = &[
    "databases-for-postgresql",
    "databases-for-etcd",
    "databases-for-redis",
    "databases-for-mongodb",
    "databases-for-mysql",
];

pub const POWER_SYSTEM_TYPES: &[&str] = &["s922", "e880", "e980", "s1022"];

pub const POWER_PROC_TYPES: &[&str] = &["shared", "capped", "dedicated"];

pub const POWER_STORAGE_OPTIONS: &[&str] = &["None", "Storage Type", "Storage Pool", "Affinity", "Anti-Affinity"];

pub const POWER_STORAGE_TYPES: &[&str] = &["tier0", "tier1", "tier3", "tier5k"];

pub const POWER_NETWORK_TYPES: &[&str] = &["vlan", "pub-vlan"];

pub const POWER_CONNECTION_SPEEDS: &[&str] = &["50", "100", "200", "500", "1000", "2000", "5000", "10000"];

pub const CLASSIC_VLAN_TYPES: &[&str] = &["PUBLIC", "PRIVATE"];

pub const CLASSIC_NETWORK_SPEEDS: &[&str] = &["100", "1000", "10000"];

/// Power VS zones for a region; with high availability only replicated zones
pub fn power_zones(region: &str, high_availability: bool) -> Vec<&'static str> {
    POWER_ZONES
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, zones)| {
            zones
                .iter()
                .copied()
                .filter(|z| !high_availability || POWER_HA_ZONES.contains(z))
                .collect()
        })
        .unwrap_or_default()
}
