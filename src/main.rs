use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use infra_lifecycle::config::{default_config_path, load_config_from_file, validate_run_config};
use infra_lifecycle::{HelperRegistry, LogCollector, PhaseOrchestrator, RunStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // =========================================================================
    // CONFIGURATION - first CLI argument or the default location
    // =========================================================================
    let config_path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => default_config_path()?,
    };
    let config = load_config_from_file(&config_path)
        .with_context(|| format!("Failed to load run config {}", config_path.display()))?;
    validate_run_config(&config).context("Invalid run config")?;

    // =========================================================================
    // LOGGING - one collector for the run, also the global `log` backend
    // =========================================================================
    let collector = match config.log_dir {
        Some(ref dir) => LogCollector::new(dir).map_err(anyhow::Error::msg)?,
        None => LogCollector::in_memory(),
    }
    .with_max_level(config.level_filter());
    let collector = Arc::new(collector);

    if let Err(e) = collector.init_global_logger(config.level_filter()) {
        eprintln!("[Main] WARNING: Failed to register global logger: {}", e);
    }
    if let Some(path) = collector.log_path() {
        eprintln!("[Main] Logging to {}", path.display());
    }

    // =========================================================================
    // ORCHESTRATOR - a checkpoint, when present, must be resumable
    // =========================================================================
    let registry = HelperRegistry::with_builtin_providers();
    let orchestrator = PhaseOrchestrator::start_or_resume(&registry, &config, collector.clone())
        .context("Cannot start run")?;

    // Ctrl-C only takes effect between phases
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("[Main] Interrupt received, stopping after the current phase");
            let _ = cancel_tx.send(true);
        }
    });

    let mut orchestrator = orchestrator
        .with_cancellation(cancel_rx)
        .with_log_collector(collector.clone());

    let result = orchestrator.run().await;
    let state = orchestrator.into_state();

    // =========================================================================
    // SHUTDOWN - flush logs, print summary
    // =========================================================================
    if let Err(e) = collector.wait_for_empty().await {
        eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
    }
    if collector.log_path().is_none() {
        for line in collector.lines() {
            eprintln!("[{}] [{}] [{}] {}", line.timestamp, line.level, line.target, line.message);
        }
    }

    println!("{}", serde_json::to_string_pretty(&state)?);

    match result {
        Ok(()) if state.status == RunStatus::Completed => Ok(()),
        Ok(()) => anyhow::bail!("Run ended in status {}", state.status),
        Err(e) => Err(e).context(format!("{} run failed", state.provider)),
    }
}
