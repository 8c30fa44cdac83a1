//! Cluster infrastructure lifecycle orchestration
//!
//! This crate sequences cluster provisioning through a fixed set of phases and
//! delegates the provider-specific work of each phase to a pluggable helper.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Phases, cluster metadata, phase input/output
//! - **helper**: The `InfraHelper` capability trait, its no-op defaults and the registry
//! - **providers**: Built-in helpers (azure, aws, gcp)
//! - **orchestrator**: Run state, checkpoints and the `PhaseOrchestrator`
//! - **config**: Run configuration loading and validation
//! - **log_collector**: Logging collaborator injected into helpers

// Core foundational modules
pub mod error;
pub mod models;

// Capability interface and provider implementations
pub mod helper;
pub mod providers;

// Sequencing and run state
pub mod orchestrator;

// Run configuration
pub mod config;

// Logging collaborator
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{ConfigError, OrchestratorError, PhaseError, Result, RunError};

pub use models::{ClusterMetadata, PhaseInput, PhaseOutput, ProvisioningPhase, ResourceRef};

pub use helper::{
    invoke_phase, DefaultInfraHelper, HelperFactory, HelperRegistry, InfraHelper, PhaseFuture,
    PhaseResult,
};

pub use providers::{AwsInfraHelper, AzureInfraHelper, GcpInfraHelper};

pub use orchestrator::{PhaseOrchestrator, RunState, RunStatus};

pub use config::RunConfig;

pub use log_collector::{LogCollector, LogLine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
