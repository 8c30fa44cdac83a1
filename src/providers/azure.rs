//! Azure infrastructure helper.
//!
//! Azure does its provisioning through the cluster-api provider, so the hooks
//! here only announce themselves.

use std::sync::Arc;

use crate::helper::{InfraHelper, PhaseFuture};
use crate::log_collector::LogCollector;
use crate::models::{PhaseInput, PhaseOutput};

pub const PROVIDER: &str = "azure";

pub struct AzureInfraHelper {
    log: Arc<LogCollector>,
}

impl AzureInfraHelper {
    pub fn new(log: Arc<LogCollector>) -> Self {
        AzureInfraHelper { log }
    }
}

impl InfraHelper for AzureInfraHelper {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn pre_provision<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            self.log.info(PROVIDER, "Calling Azure PreProvision override");
            Ok(PhaseOutput::default())
        })
    }

    fn control_plane_available<'a>(&'a self, _input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            self.log.info(PROVIDER, "Calling Azure ControlPlaneAvailable");
            Ok(PhaseOutput::default())
        })
    }
}
