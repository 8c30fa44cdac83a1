//! Core data types for the provisioning lifecycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::orchestrator::RunState;

/// Provisioning phase - discrete, strictly ordered steps of a cluster run.
///
/// Declaration order is lifecycle order; the derived `Ord` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningPhase {
    /// Before any cluster resource exists
    PreProvision,

    /// Cluster network and shared infrastructure report ready
    InfraReady,

    /// Bootstrap machine configuration is published
    Ignition,

    /// Control plane endpoint is reachable
    ControlPlaneAvailable,

    /// All machines are provisioned
    PostProvision,

    /// Bootstrap resources are torn down
    BootstrapDestroy,

    /// Bootstrap teardown has completed
    PostDestroy,
}

impl ProvisioningPhase {
    /// Every phase, in lifecycle order.
    pub const ALL: [ProvisioningPhase; 7] = [
        ProvisioningPhase::PreProvision,
        ProvisioningPhase::InfraReady,
        ProvisioningPhase::Ignition,
        ProvisioningPhase::ControlPlaneAvailable,
        ProvisioningPhase::PostProvision,
        ProvisioningPhase::BootstrapDestroy,
        ProvisioningPhase::PostDestroy,
    ];

    /// The phase every run starts with.
    pub fn first() -> Self {
        ProvisioningPhase::ALL[0]
    }

    /// Zero-based position of this phase in the lifecycle.
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// The phase after this one, or `None` for the last phase.
    pub fn next(&self) -> Option<Self> {
        ProvisioningPhase::ALL.get(self.ordinal() + 1).copied()
    }

    /// Get the kebab-case name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningPhase::PreProvision => "pre-provision",
            ProvisioningPhase::InfraReady => "infra-ready",
            ProvisioningPhase::Ignition => "ignition",
            ProvisioningPhase::ControlPlaneAvailable => "control-plane-available",
            ProvisioningPhase::PostProvision => "post-provision",
            ProvisioningPhase::BootstrapDestroy => "bootstrap-destroy",
            ProvisioningPhase::PostDestroy => "post-destroy",
        }
    }

    /// Upper-case tag used in log lines, e.g. `[PRE_PROVISION]`.
    pub fn log_tag(&self) -> String {
        self.as_str().replace('-', "_").to_uppercase()
    }
}

impl fmt::Display for ProvisioningPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisioningPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        ProvisioningPhase::ALL
            .iter()
            .find(|phase| phase.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("Unknown provisioning phase: {}", s))
    }
}

/// Identity and placement of the cluster being provisioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterMetadata {
    /// Human-facing cluster name
    pub cluster_name: String,

    /// Unique infrastructure id used to name cloud resources
    pub infra_id: String,

    /// Cloud region, when the platform has one
    pub region: Option<String>,

    /// DNS base domain for cluster endpoints
    pub base_domain: String,

    /// Platform-specific settings (e.g. `gcp.project_id`)
    pub labels: BTreeMap<String, String>,
}

impl ClusterMetadata {
    pub fn new(cluster_name: impl Into<String>, infra_id: impl Into<String>) -> Self {
        ClusterMetadata {
            cluster_name: cluster_name.into(),
            infra_id: infra_id.into(),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_base_domain(mut self, base_domain: impl Into<String>) -> Self {
        self.base_domain = base_domain.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Reference to a resource that already exists in the target cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        ResourceRef {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Read-only snapshot handed to a helper for exactly one phase call.
///
/// Built fresh by the orchestrator from the current run state immediately
/// before the call; helpers only ever see it by shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseInput {
    pub phase: ProvisioningPhase,
    pub metadata: ClusterMetadata,
    pub resources: BTreeMap<String, ResourceRef>,
    pub outputs: BTreeMap<String, String>,
}

impl PhaseInput {
    /// Snapshot the run state for `phase`.
    pub fn from_state(phase: ProvisioningPhase, state: &RunState) -> Self {
        PhaseInput {
            phase,
            metadata: state.metadata.clone(),
            resources: state.resources.clone(),
            outputs: state.outputs.clone(),
        }
    }

    /// Input with only metadata, as seen by the first phase of a fresh run.
    pub fn bare(phase: ProvisioningPhase, metadata: ClusterMetadata) -> Self {
        PhaseInput {
            phase,
            metadata,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

/// State delta returned by a helper. The default value changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOutput {
    pub resources: BTreeMap<String, ResourceRef>,
    pub outputs: BTreeMap<String, String>,
}

impl PhaseOutput {
    pub fn with_resource(mut self, name: impl Into<String>, resource: ResourceRef) -> Self {
        self.resources.insert(name.into(), resource);
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }
}
