//! Unified error type hierarchy for the provisioning lifecycle
//!
//! Provides structured error handling with PhaseError, OrchestratorError,
//! RunError and ConfigError.

use std::io;
use thiserror::Error;

use crate::models::ProvisioningPhase;
use crate::orchestrator::RunStatus;

/// Raised by a provider helper when its phase could not complete.
///
/// The orchestrator never rewrites these; they reach the caller exactly as the
/// provider produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    #[error("{provider} {phase}: invalid input: {reason}")]
    InvalidInput {
        provider: String,
        phase: ProvisioningPhase,
        reason: String,
    },

    #[error("{provider} {phase}: missing prerequisite '{key}' from an earlier phase")]
    MissingPrerequisite {
        provider: String,
        phase: ProvisioningPhase,
        key: String,
    },

    #[error("{provider} {phase} failed: {reason}")]
    Failed {
        provider: String,
        phase: ProvisioningPhase,
        reason: String,
    },
}

impl PhaseError {
    /// The phase that reported the failure.
    pub fn phase(&self) -> ProvisioningPhase {
        match self {
            PhaseError::InvalidInput { phase, .. }
            | PhaseError::MissingPrerequisite { phase, .. }
            | PhaseError::Failed { phase, .. } => *phase,
        }
    }

    /// The provider id that reported the failure.
    pub fn provider(&self) -> &str {
        match self {
            PhaseError::InvalidInput { provider, .. }
            | PhaseError::MissingPrerequisite { provider, .. }
            | PhaseError::Failed { provider, .. } => provider,
        }
    }
}

/// Sequencing invariant violations detected by the orchestrator itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("No infrastructure helper registered for provider '{0}'")]
    NoHelperRegistered(String),

    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("Phase {requested} requested out of order (next phase: {})", next_label(.expected))]
    OutOfOrder {
        expected: Option<ProvisioningPhase>,
        requested: ProvisioningPhase,
    },

    #[error("Run is not active (status: {0})")]
    RunNotActive(RunStatus),

    #[error("Run cancelled before phase {0}")]
    Cancelled(ProvisioningPhase),

    #[error("Run cannot be resumed: {0}")]
    NotResumable(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

fn next_label(expected: &Option<ProvisioningPhase>) -> &'static str {
    expected.map(|p| p.as_str()).unwrap_or("none")
}

/// Error surfaced by a lifecycle run.
///
/// Both variants are transparent so `to_string()` on a phase failure is the
/// provider's own message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl RunError {
    /// Returns the provider failure if this run aborted inside a phase.
    pub fn as_phase_error(&self) -> Option<&PhaseError> {
        match self {
            RunError::Phase(e) => Some(e),
            RunError::Orchestrator(_) => None,
        }
    }
}

/// Run configuration parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Failed to serialize config as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Top-level result type for lifecycle runs.
pub type Result<T> = std::result::Result<T, RunError>;
