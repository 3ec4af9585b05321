use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use stratus_core::disable_save::registry;
use stratus_core::document::{ConfigDocument, ResourceExt};
use stratus_core::invalid_forms::{InvalidResource, invalid_forms, invalid_resources};
use stratus_core::kind::ResourceKind;
use stratus_core::views::{NO_SUBNETS, TierSlot, display_tiers, tier_projection};
use stratus_state::{StoreOptions, load_store};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Validate and inspect cloud landing zone configurations", long_about = None)]
struct Cli {
    /// Log every store mutation and cascade
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Reject documents missing collections added in later formats
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every form of a configuration document
    Check {
        /// Path to the configuration JSON file
        file: PathBuf,
    },
    /// Show the subnet tiers of a VPC, one slot per zone
    Tiers {
        /// Path to the configuration JSON file
        file: PathBuf,

        /// VPC name
        #[arg(long)]
        vpc: String,
    },
    /// List the fields of a resource kind
    Fields {
        /// Resource kind, e.g. vpcs, acl_rules, power_instances
        kind: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = StoreOptions::new().upgrade_missing_keys(!cli.strict);
    let result = match cli.command {
        Commands::Check { file } => run_check(&file, options),
        Commands::Tiers { file, vpc } => run_tiers(&file, &vpc, options),
        Commands::Fields { kind } => run_fields(&kind),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn run_check(file: &Path, options: StoreOptions) -> Result<(), String> {
    let doc = checked_document(file, options)?;

    println!("{}", format!("Checking {}...", file.display()).cyan());

    let forms = invalid_forms(&doc);
    if forms.is_empty() {
        println!("{}", "✓ Every form is valid.".green().bold());
        return Ok(());
    }

    for line in check_report(&doc, &forms) {
        println!("{}", line);
    }
    Err(format!("{} invalid form(s)", forms.len()))
}

/// The document as the store holds it, with derived fields recomputed
fn checked_document(file: &Path, options: StoreOptions) -> Result<ConfigDocument, String> {
    let store = load_store(file, options).map_err(|e| e.to_string())?;
    Ok(store.into_document())
}

/// One line per failing form followed by its invalid resources
fn check_report(doc: &ConfigDocument, forms: &[&'static str]) -> Vec<String> {
    let resources = invalid_resources(doc);
    let mut lines = Vec::new();
    for form in forms {
        lines.push(format!("{}", form.red().bold()));
        for resource in resources.iter().filter(|r| r.kind.form() == *form) {
            lines.push(format!("  • {}", describe_problem(resource)));
        }
    }
    lines
}

fn describe_problem(resource: &InvalidResource) -> String {
    match resource.problem.field {
        Some(field) => format!("{} ({}): {}", resource.path, field, resource.problem.message),
        None => format!("{}: {}", resource.path, resource.problem.message),
    }
}

fn run_tiers(file: &Path, vpc_name: &str, options: StoreOptions) -> Result<(), String> {
    let store = load_store(file, options).map_err(|e| e.to_string())?;
    let doc = store.document();
    let vpc = doc
        .vpcs
        .iter()
        .find(|v| v.name() == vpc_name)
        .ok_or_else(|| format!("VPC '{}' not found in {}", vpc_name, file.display()))?;

    for tier in display_tiers(doc, vpc) {
        if tier == NO_SUBNETS {
            println!(
                "{}",
                "! Some services in this VPC have no subnet selected".yellow()
            );
            continue;
        }
        println!("{}", tier.bold());
        for (index, slot) in tier_projection(doc, vpc, &tier).iter().enumerate() {
            println!("  {}", format_slot(index + 1, slot));
        }
    }
    Ok(())
}

fn format_slot(zone: usize, slot: &TierSlot<'_>) -> String {
    match slot {
        TierSlot::Subnet(subnet) => {
            let cidr = subnet.text("cidr");
            if cidr.is_empty() {
                format!("zone {}: {}", zone, subnet.name())
            } else {
                format!("zone {}: {} ({})", zone, subnet.name(), cidr)
            }
        }
        TierSlot::Placeholder { .. } => format!("zone {}: {}", zone, "(none)".dimmed()),
    }
}

fn run_fields(kind: &str) -> Result<(), String> {
    let kind: ResourceKind = kind.parse().map_err(|e| format!("{}", e))?;
    let schema = registry()
        .get(kind)
        .ok_or_else(|| format!("No schema registered for {}", kind))?;

    println!("{} ({})", kind.as_str().bold(), kind.form());
    if let Some(description) = &schema.description {
        println!("{}", description.dimmed());
    }
    for name in schema.field_names() {
        println!("  • {}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_check_report_groups_by_form() {
        colored::control::set_override(false);
        let doc: ConfigDocument = serde_json::from_value(json!({
            "vpcs": [{
                "name": "management",
                "acls": [{
                    "name": "management-acl",
                    "rules": [{
                        "name": "allow-all",
                        "action": "allow",
                        "direction": "inbound",
                        "source": "1.2.3.4/33",
                        "destination": "10.0.0.0/8",
                        "ruleProtocol": "all",
                        "rule": {}
                    }]
                }]
            }]
        }))
        .unwrap();
        let forms = invalid_forms(&doc);
        assert!(forms.contains(&"/form/nacls"));

        let lines = check_report(&doc, &forms);
        assert!(lines.iter().any(|l| l == "/form/nacls"));
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("  • vpcs/management/acls/management-acl/rules/allow-all (source)"))
        );
    }

    #[test]
    fn test_format_slot() {
        colored::control::set_override(false);
        let subnet = json!({ "name": "vsi-zone-1", "cidr": "10.10.10.0/24" });
        let slot = TierSlot::Subnet(subnet.as_object().unwrap());
        assert_eq!(format_slot(1, &slot), "zone 1: vsi-zone-1 (10.10.10.0/24)");
        assert_eq!(format_slot(2, &TierSlot::placeholder(2)), "zone 2: (none)");
    }

    #[test]
    fn test_unknown_kind() {
        let err = run_fields("widgets").unwrap_err();
        assert_eq!(err, "Unknown resource kind 'widgets'");
        assert!(run_fields("vpcs").is_ok());
    }

    #[test]
    fn test_check_sees_derived_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = json!({
            "_options": { "dynamic_subnets": true, "zones": 3 },
            "vpcs": [{
                "name": "management",
                "subnets": [{ "name": "vsi-zone-1", "zone": 1, "vpc": "stale" }]
            }]
        });
        std::fs::write(&path, doc.to_string()).unwrap();
        let options = StoreOptions::new().skip_validation(true);
        let checked = checked_document(&path, options).unwrap();
        let subnet = checked.vpcs[0].children("subnets")[0];
        assert_eq!(subnet.text("cidr"), "10.10.10.0/24");
        assert_eq!(subnet.text("vpc"), "management");
    }

    #[test]
    fn test_tiers_for_missing_vpc() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{}").unwrap();
        let options = StoreOptions::new().skip_validation(true);
        let err = run_tiers(&path, "edge", options).unwrap_err();
        assert!(err.starts_with("VPC 'edge' not found"));
    }
}
