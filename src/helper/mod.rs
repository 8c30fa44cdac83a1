//! Infrastructure helper capability interface.
//!
//! `InfraHelper` has one method per [`ProvisioningPhase`]. Every method has a
//! no-op default body, so a provider implements only the phases it cares
//! about and still satisfies the whole contract:
//!
//! ```ignore
//! struct MyCloud { log: Arc<LogCollector> }
//!
//! impl InfraHelper for MyCloud {
//!     fn provider(&self) -> &str { "mycloud" }
//!
//!     fn infra_ready<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
//!         Box::pin(async move {
//!             self.log.info("mycloud", format!("network ready for {}", input.metadata.infra_id));
//!             Ok(PhaseOutput::default())
//!         })
//!     }
//! }
//! ```
//!
//! Adding a phase means adding a default method here and an arm in
//! [`invoke_phase`]; existing providers keep compiling untouched.

pub mod registry;

pub use registry::{HelperFactory, HelperRegistry};

use futures::future::{self, BoxFuture};

use crate::error::PhaseError;
use crate::models::{PhaseInput, PhaseOutput, ProvisioningPhase};

/// Result of a single phase call.
pub type PhaseResult = Result<PhaseOutput, PhaseError>;

/// Boxed future returned by every phase method.
pub type PhaseFuture<'a> = BoxFuture<'a, PhaseResult>;

/// Completed future carrying an empty output. Used by every default body.
pub fn noop<'a>() -> PhaseFuture<'a> {
    Box::pin(future::ready(Ok(PhaseOutput::default())))
}

/// Provider-specific implementation of the phase hooks.
pub trait InfraHelper: Send + Sync {
    /// Provider id this helper is registered under.
    fn provider(&self) -> &str;

    fn pre_provision<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        noop()
    }

    fn infra_ready<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        noop()
    }

    fn ignition<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        noop()
    }

    fn control_plane_available<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        noop()
    }

    fn post_provision<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        noop()
    }

    fn bootstrap_destroy<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        noop()
    }

    fn post_destroy<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        noop()
    }
}

/// Route `input` to the helper method matching `input.phase`.
pub fn invoke_phase<'a>(helper: &'a dyn InfraHelper, input: &'a PhaseInput) -> PhaseFuture<'a> {
    match input.phase {
        ProvisioningPhase::PreProvision => helper.pre_provision(input),
        ProvisioningPhase::InfraReady => helper.infra_ready(input),
        ProvisioningPhase::Ignition => helper.ignition(input),
        ProvisioningPhase::ControlPlaneAvailable => helper.control_plane_available(input),
        ProvisioningPhase::PostProvision => helper.post_provision(input),
        ProvisioningPhase::BootstrapDestroy => helper.bootstrap_destroy(input),
        ProvisioningPhase::PostDestroy => helper.post_destroy(input),
    }
}

/// Helper that overrides nothing. Registered as the `none` provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInfraHelper;

pub const DEFAULT_PROVIDER: &str = "none";

impl InfraHelper for DefaultInfraHelper {
    fn provider(&self) -> &str {
        DEFAULT_PROVIDER
    }
}
