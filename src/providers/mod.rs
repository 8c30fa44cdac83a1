//! Built-in provider helpers.
//!
//! Each provider overrides only the phases it needs; everything else falls
//! through to the no-op defaults on [`InfraHelper`](crate::helper::InfraHelper).
//!
//! | Provider | Overridden phases                                   |
//! |----------|-----------------------------------------------------|
//! | `azure`  | pre-provision, control-plane-available              |
//! | `aws`    | pre-provision, ignition, bootstrap-destroy          |
//! | `gcp`    | pre-provision, ignition, post-provision             |
//! | `none`   | (none, see `DefaultInfraHelper`)                    |

pub mod aws;
pub mod azure;
pub mod gcp;

pub use aws::AwsInfraHelper;
pub use azure::AzureInfraHelper;
pub use gcp::GcpInfraHelper;

/// Output key under which providers publish where bootstrap ignition lives.
pub const BOOTSTRAP_IGNITION_LOCATION: &str = "bootstrap_ignition_location";
