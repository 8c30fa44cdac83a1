//! Run state checkpoints.
//!
//! After every successful phase the orchestrator can persist its `RunState`
//! as pretty JSON so an interrupted run resumes from the next phase instead of
//! starting over.

use std::fs;
use std::path::{Path, PathBuf};

use super::state::RunState;
use crate::error::OrchestratorError;

/// File name used inside the checkpoint directory.
pub const CHECKPOINT_FILE: &str = "run-state.json";

pub fn checkpoint_path(dir: &Path) -> PathBuf {
    dir.join(CHECKPOINT_FILE)
}

/// Write `state` to `<dir>/run-state.json`, creating `dir` if needed.
///
/// Writes to a temporary file first and renames it, so a crash never leaves
/// a truncated checkpoint behind.
pub fn save_checkpoint(dir: &Path, state: &RunState) -> Result<PathBuf, OrchestratorError> {
    fs::create_dir_all(dir).map_err(|e| {
        OrchestratorError::Checkpoint(format!(
            "Failed to create checkpoint directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let json = serde_json::to_string_pretty(state)
        .map_err(|e| OrchestratorError::Checkpoint(format!("Failed to serialize state: {}", e)))?;

    let path = checkpoint_path(dir);
    let tmp = dir.join(format!("{}.tmp", CHECKPOINT_FILE));
    fs::write(&tmp, json).map_err(|e| {
        OrchestratorError::Checkpoint(format!("Failed to write {}: {}", tmp.display(), e))
    })?;
    fs::rename(&tmp, &path).map_err(|e| {
        OrchestratorError::Checkpoint(format!("Failed to move checkpoint into place: {}", e))
    })?;

    Ok(path)
}

/// Load a previously saved state. `Ok(None)` when no checkpoint exists.
pub fn load_checkpoint(dir: &Path) -> Result<Option<RunState>, OrchestratorError> {
    let path = checkpoint_path(dir);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        OrchestratorError::Checkpoint(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let state: RunState = serde_json::from_str(&content).map_err(|e| {
        OrchestratorError::Checkpoint(format!("Corrupt checkpoint {}: {}", path.display(), e))
    })?;

    if !state.is_consistent() {
        return Err(OrchestratorError::Checkpoint(format!(
            "Checkpoint {} lists phases out of order",
            path.display()
        )));
    }

    Ok(Some(state))
}
