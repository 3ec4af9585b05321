//! Which services a diagram draws inside a VPC or subnet box

use crate::document::{Resource, ResourceExt};
use crate::kind::ResourceKind;

/// A diagram box: a VPC, optionally narrowed to one of its subnets
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagramItem<'a> {
    pub vpc: Option<&'a Resource>,
    pub subnet: Option<&'a Resource>,
}

impl<'a> DiagramItem<'a> {
    pub fn new(vpc: Option<&'a Resource>, subnet: Option<&'a Resource>) -> Self {
        Self { vpc, subnet }
    }

    fn vpc_name(&self) -> Option<&'a str> {
        self.vpc.map(ResourceExt::name)
    }

    fn subnet_name(&self) -> Option<&'a str> {
        self.subnet.map(ResourceExt::name)
    }
}

fn non_empty<'a>(resource: &'a Resource, field: &str) -> Option<&'a str> {
    resource.str_field(field).filter(|s| !s.is_empty())
}

/// True when `resource` of `kind` is drawn inside `item`. A box without a
/// subnet holds the services that have none selected.
pub fn should_display_service(item: &DiagramItem<'_>, kind: ResourceKind, resource: &Resource) -> bool {
    if item.vpc_name() != non_empty(resource, "vpc") {
        return false;
    }
    let subnet = item.subnet_name();
    match kind {
        ResourceKind::Vsi
        | ResourceKind::Clusters
        | ResourceKind::LoadBalancers
        | ResourceKind::VpnServers
        | ResourceKind::VirtualPrivateEndpoints => {
            let subnets = resource.strings("subnets");
            match subnet {
                Some(name) => subnets.contains(&name),
                None => subnets.is_empty(),
            }
        }
        ResourceKind::VpnGateways => non_empty(resource, "subnet") == subnet,
        ResourceKind::FortigateVnf => subnet.is_some_and(|name| {
            non_empty(resource, "primary_subnet") == Some(name)
                || non_empty(resource, "secondary_subnet") == Some(name)
        }),
        _ => false,
    }
}
