//! Run configuration.
//!
//! A `RunConfig` names the provider, describes the cluster, and optionally
//! seeds already-existing resources plus checkpoint and log locations.
//!
//! # Module Structure
//!
//! - `loader`: reads and writes configs as JSON or TOML, chosen by extension
//! - `validator`: rejects configs the orchestrator could not run

pub mod loader;
pub mod validator;

pub use loader::{default_config_path, load_config_from_file, save_config_to_file};
pub use validator::validate_run_config;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::models::{ClusterMetadata, ResourceRef};

/// Everything needed to start one lifecycle run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Provider id, e.g. `azure`, `aws`, `gcp` or `none`
    pub provider: String,

    /// One of `error`, `warn`, `info`, `debug`, `trace`
    pub log_level: String,

    /// Where to write `run-state.json` after each phase
    pub checkpoint_dir: Option<PathBuf>,

    /// Where to persist run logs; memory-only when unset
    pub log_dir: Option<PathBuf>,

    pub cluster: ClusterMetadata,

    /// Resources that exist before the run starts (e.g. a BYO network)
    pub resources: BTreeMap<String, ResourceRef>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            provider: crate::helper::DEFAULT_PROVIDER.to_string(),
            log_level: "info".to_string(),
            checkpoint_dir: None,
            log_dir: None,
            cluster: ClusterMetadata::default(),
            resources: BTreeMap::new(),
        }
    }
}

impl RunConfig {
    /// Parsed `log_level`, falling back to `Info` when unrecognised.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}
