//! Run state management and phase tracking.
//!
//! **Architecture**:
//! - `RunStatus`: coarse lifecycle of a whole run
//! - `RunState`: accumulated metadata, resources and outputs plus the list of
//!   completed phases; the next phase is always derived from that list
//! - State transitions are applied by the `PhaseOrchestrator`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{ClusterMetadata, PhaseOutput, ProvisioningPhase, ResourceRef};

/// Coarse status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no phase started yet
    Pending,

    /// At least one phase attempted, more to go
    Running,

    /// Every phase completed successfully
    Completed,

    /// A phase returned an error; the run stopped there
    Failed,

    /// Stopped at a phase boundary on request
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Get all valid status transitions FROM this status.
    pub fn valid_next_statuses(&self) -> Vec<RunStatus> {
        match self {
            RunStatus::Pending => vec![
                RunStatus::Running,
                RunStatus::Completed,
                RunStatus::Failed,
                RunStatus::Cancelled,
            ],
            RunStatus::Running => vec![
                RunStatus::Running,
                RunStatus::Completed,
                RunStatus::Failed,
                RunStatus::Cancelled,
            ],
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => vec![],
        }
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        self.valid_next_statuses().contains(&next)
    }

    /// Whether phases may still be executed.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Pending | RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run has accumulated so far.
///
/// Serializable so it can be checkpointed and resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Provider id the helper was resolved from
    pub provider: String,

    pub metadata: ClusterMetadata,

    /// Resource references, seeded from config and extended by phase outputs
    pub resources: BTreeMap<String, ResourceRef>,

    /// Key/value outputs published by earlier phases
    pub outputs: BTreeMap<String, String>,

    /// Phases that finished successfully, in execution order
    pub completed_phases: Vec<ProvisioningPhase>,

    pub status: RunStatus,

    /// Phase that returned the error, if the run failed
    pub failed_phase: Option<ProvisioningPhase>,

    /// Error message if the run failed or was cancelled
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Create a new run state with no completed phases.
    pub fn new(provider: impl Into<String>, metadata: ClusterMetadata) -> Self {
        let now = Utc::now();
        RunState {
            provider: provider.into(),
            metadata,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            completed_phases: Vec::new(),
            status: RunStatus::Pending,
            failed_phase: None,
            error: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn with_resources(mut self, resources: BTreeMap<String, ResourceRef>) -> Self {
        self.resources = resources;
        self
    }

    /// The phase that must run next, or `None` once every phase completed.
    pub fn next_phase(&self) -> Option<ProvisioningPhase> {
        match self.completed_phases.last() {
            None => Some(ProvisioningPhase::first()),
            Some(last) => last.next(),
        }
    }

    /// The most recently completed phase.
    pub fn current_phase(&self) -> Option<ProvisioningPhase> {
        self.completed_phases.last().copied()
    }

    /// Completed phases form a strictly increasing prefix of the lifecycle.
    pub fn is_consistent(&self) -> bool {
        self.completed_phases
            .iter()
            .enumerate()
            .all(|(i, phase)| phase.ordinal() == i)
    }

    /// Attempt a status transition.
    pub fn transition_to(&mut self, next: RunStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Invalid status transition: {} -> {}",
                self.status, next
            ));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Fold a successful phase into the state.
    ///
    /// Keys already present are overwritten by the newer phase.
    pub fn record_phase_complete(&mut self, phase: ProvisioningPhase, output: PhaseOutput) {
        self.resources.extend(output.resources);
        self.outputs.extend(output.outputs);
        self.completed_phases.push(phase);
        self.status = if self.next_phase().is_none() {
            RunStatus::Completed
        } else {
            RunStatus::Running
        };
        self.updated_at = Utc::now();
    }

    /// Record an error and mark the run as failed.
    pub fn record_error(&mut self, phase: ProvisioningPhase, error: String) {
        self.failed_phase = Some(phase);
        self.error = Some(error);
        self.status = RunStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Record a cancellation observed before `phase` started.
    pub fn record_cancelled(&mut self, phase: ProvisioningPhase) {
        self.error = Some(format!("cancelled before {}", phase));
        self.status = RunStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    /// Time elapsed between run start and the last update.
    pub fn elapsed(&self) -> chrono::Duration {
        self.updated_at - self.started_at
    }
}
