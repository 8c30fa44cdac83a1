//! AWS infrastructure helper.
//!
//! Ignition is served from an S3 bucket named after the infra id, so the
//! bootstrap teardown can only run once the ignition phase has published it.

use std::sync::Arc;

use super::BOOTSTRAP_IGNITION_LOCATION;
use crate::error::PhaseError;
use crate::helper::{InfraHelper, PhaseFuture};
use crate::log_collector::LogCollector;
use crate::models::{PhaseInput, PhaseOutput};

pub const PROVIDER: &str = "aws";

/// Output key recording the region the run was validated against.
pub const REGION_OUTPUT: &str = "aws.region";

pub struct AwsInfraHelper {
    log: Arc<LogCollector>,
}

impl AwsInfraHelper {
    pub fn new(log: Arc<LogCollector>) -> Self {
        AwsInfraHelper { log }
    }

    /// `s3://<infra_id>-bootstrap/bootstrap.ign`
    pub fn ignition_location(infra_id: &str) -> String {
        format!("s3://{}-bootstrap/bootstrap.ign", infra_id)
    }
}

impl InfraHelper for AwsInfraHelper {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn pre_provision<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            let region = input
                .metadata
                .region
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| PhaseError::InvalidInput {
                    provider: PROVIDER.to_string(),
                    phase: input.phase,
                    reason: "region is not set".to_string(),
                })?;

            self.log.info(
                PROVIDER,
                format!(
                    "PreProvision: tagging shared resources for {} in {}",
                    input.metadata.infra_id, region
                ),
            );
            Ok(PhaseOutput::default().with_output(REGION_OUTPUT, region))
        })
    }

    fn ignition<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            let location = AwsInfraHelper::ignition_location(&input.metadata.infra_id);
            self.log.info(PROVIDER, format!("Ignition: bootstrap config at {}", location));
            Ok(PhaseOutput::default().with_output(BOOTSTRAP_IGNITION_LOCATION, location))
        })
    }

    fn bootstrap_destroy<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            let location = input.output(BOOTSTRAP_IGNITION_LOCATION).ok_or_else(|| {
                PhaseError::MissingPrerequisite {
                    provider: PROVIDER.to_string(),
                    phase: input.phase,
                    key: BOOTSTRAP_IGNITION_LOCATION.to_string(),
                }
            })?;
            self.log.info(
                PROVIDER,
                format!("BootstrapDestroy: removing bootstrap ignition at {}", location),
            );
            Ok(PhaseOutput::default())
        })
    }
}
