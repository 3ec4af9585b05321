//! Read-only projections used to draw diagrams
//!
//! Nothing here mutates the document.

pub mod classic;
pub mod services;
pub mod tiers;

pub use classic::{
    ClassicRow, classic_bare_metal_on_vlan, classic_datacenters, classic_gateways_on_vlan, classic_subnets,
    classic_vsi_on_vlan,
};
pub use services::{DiagramItem, should_display_service};
pub use tiers::{NO_SUBNETS, TierSlot, display_tiers, has_unattached_services, tier_projection};
