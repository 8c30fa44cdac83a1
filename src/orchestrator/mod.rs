//! Phase orchestration: drives one provider helper through the provisioning
//! lifecycle (PreProvision -> InfraReady -> Ignition -> ControlPlaneAvailable
//! -> PostProvision -> BootstrapDestroy -> PostDestroy).

pub mod checkpoint;
pub mod state;

pub use checkpoint::{load_checkpoint, save_checkpoint};
pub use state::{RunState, RunStatus};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::RunConfig;
use crate::error::{OrchestratorError, RunError};
use crate::helper::{invoke_phase, HelperRegistry, InfraHelper};
use crate::log_collector::LogCollector;
use crate::models::{ClusterMetadata, PhaseInput, ProvisioningPhase};

/// Owns one run: its helper, its state, and nothing shared.
///
/// Phases execute strictly one after another. The helper is resolved once at
/// construction and dropped together with the orchestrator.
pub struct PhaseOrchestrator {
    helper: Box<dyn InfraHelper>,

    state: RunState,

    /// Directory for `run-state.json` checkpoints
    checkpoint_dir: Option<PathBuf>,

    /// Cancellation flag, only consulted between phases
    cancel_rx: Option<watch::Receiver<bool>>,

    /// Receives high-level phase transition lines
    log_collector: Option<Arc<LogCollector>>,
}

impl PhaseOrchestrator {
    /// Create an orchestrator for a fresh run.
    ///
    /// # Arguments
    /// * `registry` - Source of provider helpers
    /// * `provider` - Provider id to resolve (case-insensitive)
    /// * `metadata` - Cluster identity handed to every phase
    /// * `helper_log` - Log collaborator injected into the helper
    ///
    /// # Errors
    /// `OrchestratorError::NoHelperRegistered` if `provider` is unknown.
    pub fn new(
        registry: &HelperRegistry,
        provider: &str,
        metadata: ClusterMetadata,
        helper_log: Arc<LogCollector>,
    ) -> Result<Self, OrchestratorError> {
        let helper = registry.resolve(provider, helper_log)?;
        let state = RunState::new(helper.provider(), metadata);
        log::info!(
            "[Run] Resolved '{}' helper for cluster {}",
            state.provider,
            state.metadata.infra_id
        );
        Ok(PhaseOrchestrator::with_helper(helper, state))
    }

    /// Create an orchestrator from a loaded run configuration.
    ///
    /// Seeds the state with the configured pre-existing resources and enables
    /// checkpointing when `checkpoint_dir` is set.
    pub fn from_config(
        registry: &HelperRegistry,
        config: &RunConfig,
        helper_log: Arc<LogCollector>,
    ) -> Result<Self, OrchestratorError> {
        let helper = registry.resolve(&config.provider, helper_log)?;
        let state = RunState::new(helper.provider(), config.cluster.clone())
            .with_resources(config.resources.clone());
        log::info!(
            "[Run] Resolved '{}' helper for cluster {}",
            state.provider,
            state.metadata.infra_id
        );
        let mut orchestrator = PhaseOrchestrator::with_helper(helper, state);
        orchestrator.checkpoint_dir = config.checkpoint_dir.clone();
        Ok(orchestrator)
    }

    /// Start the configured run, or continue it if `checkpoint_dir` holds one.
    ///
    /// A checkpoint always wins over a fresh start: a failed, cancelled or
    /// completed checkpoint is `NotResumable` rather than silently restarted,
    /// and one written for another provider or infra id is rejected. Other
    /// differences from the config are logged and the checkpoint is kept.
    pub fn start_or_resume(
        registry: &HelperRegistry,
        config: &RunConfig,
        helper_log: Arc<LogCollector>,
    ) -> Result<Self, OrchestratorError> {
        let Some(ref dir) = config.checkpoint_dir else {
            return PhaseOrchestrator::from_config(registry, config, helper_log);
        };
        let Some(state) = load_checkpoint(dir)? else {
            return PhaseOrchestrator::from_config(registry, config, helper_log);
        };

        let path = checkpoint::checkpoint_path(dir);
        if !HelperRegistry::same_provider(&state.provider, &config.provider)
            || state.metadata.infra_id != config.cluster.infra_id
        {
            return Err(OrchestratorError::NotResumable(format!(
                "{} belongs to '{}' run {}, config asks for '{}' run {}",
                path.display(),
                state.provider,
                state.metadata.infra_id,
                config.provider.trim(),
                config.cluster.infra_id
            )));
        }
        if !state.status.is_active() {
            return Err(OrchestratorError::NotResumable(format!(
                "run is {} (remove {} to start over)",
                state.status,
                path.display()
            )));
        }
        if state.metadata != config.cluster {
            log::warn!(
                "[Run] [CHECKPOINT] Cluster metadata differs from config, keeping checkpoint values"
            );
        }
        let missing: Vec<&str> = config
            .resources
            .keys()
            .filter(|name| !state.resources.contains_key(*name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            log::warn!(
                "[Run] [CHECKPOINT] Configured resources not in checkpoint, ignoring: {}",
                missing.join(", ")
            );
        }

        Ok(PhaseOrchestrator::resume(registry, state, helper_log)?.with_checkpoint_dir(dir))
    }

    /// Continue a checkpointed run from its next phase.
    ///
    /// Only `Pending` and `Running` states can be resumed; completed phases are
    /// never executed again.
    pub fn resume(
        registry: &HelperRegistry,
        state: RunState,
        helper_log: Arc<LogCollector>,
    ) -> Result<Self, OrchestratorError> {
        if !state.status.is_active() {
            return Err(OrchestratorError::NotResumable(format!(
                "run is {}",
                state.status
            )));
        }
        if !state.is_consistent() {
            return Err(OrchestratorError::NotResumable(
                "completed phases are out of order".to_string(),
            ));
        }
        let helper = registry.resolve(&state.provider, helper_log)?;
        log::info!(
            "[Run] Resuming '{}' run for {} at {}",
            state.provider,
            state.metadata.infra_id,
            state
                .next_phase()
                .map(|p| p.as_str())
                .unwrap_or("end of lifecycle")
        );
        Ok(PhaseOrchestrator::with_helper(helper, state))
    }

    fn with_helper(helper: Box<dyn InfraHelper>, state: RunState) -> Self {
        PhaseOrchestrator {
            helper,
            state,
            checkpoint_dir: None,
            cancel_rx: None,
            log_collector: None,
        }
    }

    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Stop the run at the next phase boundary once the flag turns `true`.
    pub fn with_cancellation(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_log_collector(mut self, collector: Arc<LogCollector>) -> Self {
        self.log_collector = Some(collector);
        self
    }

    pub fn provider(&self) -> &str {
        &self.state.provider
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Consume the orchestrator, dropping the helper and returning the state.
    pub fn into_state(self) -> RunState {
        self.state
    }

    /// The most recently completed phase.
    pub fn current_phase(&self) -> Option<ProvisioningPhase> {
        self.state.current_phase()
    }

    pub fn next_phase(&self) -> Option<ProvisioningPhase> {
        self.state.next_phase()
    }

    /// Execute exactly one phase.
    ///
    /// `phase` must be the run's next phase. On helper failure the run is
    /// marked failed and the helper's error is returned unchanged; the phase
    /// is not recorded as completed and nothing further may run.
    pub async fn run_phase(&mut self, phase: ProvisioningPhase) -> Result<(), RunError> {
        if !self.state.status.is_active() {
            return Err(OrchestratorError::RunNotActive(self.state.status).into());
        }

        let expected = self.state.next_phase();
        if expected != Some(phase) {
            return Err(OrchestratorError::OutOfOrder {
                expected,
                requested: phase,
            }
            .into());
        }

        self.state
            .transition_to(RunStatus::Running)
            .map_err(|_| OrchestratorError::RunNotActive(self.state.status))?;

        let input = PhaseInput::from_state(phase, &self.state);
        log::info!(
            "[Run] [{}] Invoking {} helper",
            phase.log_tag(),
            self.state.provider
        );

        match invoke_phase(self.helper.as_ref(), &input).await {
            Ok(output) => {
                log::debug!(
                    "[Run] [{}] Merging {} resources, {} outputs",
                    phase.log_tag(),
                    output.resources.len(),
                    output.outputs.len()
                );
                self.state.record_phase_complete(phase, output);
                if let Some(ref collector) = self.log_collector {
                    collector.log_parsed(format!("PHASE COMPLETE: {}", phase));
                }
                self.write_checkpoint();
                Ok(())
            }
            Err(e) => {
                log::error!("[Run] [{}] ✗ {}", phase.log_tag(), e);
                self.state.record_error(phase, e.to_string());
                if let Some(ref collector) = self.log_collector {
                    collector.log_parsed(format!("PHASE FAILED: {}", phase));
                }
                self.write_checkpoint();
                Err(RunError::Phase(e))
            }
        }
    }

    /// Execute every remaining phase in order, stopping at the first error.
    pub async fn run(&mut self) -> Result<(), RunError> {
        while let Some(phase) = self.state.next_phase() {
            if self.is_cancelled() {
                log::warn!("[Run] [{}] Cancellation requested, stopping", phase.log_tag());
                self.state.record_cancelled(phase);
                self.write_checkpoint();
                return Err(OrchestratorError::Cancelled(phase).into());
            }
            self.run_phase(phase).await?;
        }

        log::info!(
            "[Run] ✓ {} lifecycle complete for {} ({} phases, {}s)",
            self.state.provider,
            self.state.metadata.infra_id,
            self.state.completed_phases.len(),
            self.state.elapsed().num_seconds()
        );
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Checkpoint failures are reported but never fail the run.
    fn write_checkpoint(&self) {
        if let Some(ref dir) = self.checkpoint_dir {
            if let Err(e) = save_checkpoint(dir, &self.state) {
                log::warn!("[Run] [CHECKPOINT] {}", e);
            }
        }
    }
}
