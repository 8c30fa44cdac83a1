//! GCP infrastructure helper.

use std::sync::Arc;

use super::BOOTSTRAP_IGNITION_LOCATION;
use crate::error::PhaseError;
use crate::helper::{InfraHelper, PhaseFuture};
use crate::log_collector::LogCollector;
use crate::models::{PhaseInput, PhaseOutput};

pub const PROVIDER: &str = "gcp";

/// Metadata label naming the GCP project that hosts the cluster.
pub const PROJECT_ID_LABEL: &str = "gcp.project_id";

pub struct GcpInfraHelper {
    log: Arc<LogCollector>,
}

impl GcpInfraHelper {
    pub fn new(log: Arc<LogCollector>) -> Self {
        GcpInfraHelper { log }
    }

    /// `gs://<infra_id>-bootstrap-ignition/bootstrap.ign`
    pub fn ignition_location(infra_id: &str) -> String {
        format!("gs://{}-bootstrap-ignition/bootstrap.ign", infra_id)
    }
}

impl InfraHelper for GcpInfraHelper {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn pre_provision<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            let project = input
                .metadata
                .label(PROJECT_ID_LABEL)
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| PhaseError::InvalidInput {
                    provider: PROVIDER.to_string(),
                    phase: input.phase,
                    reason: format!("label '{}' is required", PROJECT_ID_LABEL),
                })?;
            self.log.info(
                PROVIDER,
                format!("PreProvision: using project {}", project),
            );
            Ok(PhaseOutput::default())
        })
    }

    fn ignition<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            let location = GcpInfraHelper::ignition_location(&input.metadata.infra_id);
            self.log.info(PROVIDER, format!("Ignition: bootstrap config at {}", location));
            Ok(PhaseOutput::default().with_output(BOOTSTRAP_IGNITION_LOCATION, location))
        })
    }

    fn post_provision<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            self.log.info(
                PROVIDER,
                format!(
                    "PostProvision: {} resources tracked for {}",
                    input.resources.len(),
                    input.metadata.infra_id
                ),
            );
            Ok(PhaseOutput::default())
        })
    }
}
