//! End-to-end lifecycle runs: config loading, provider data flow between
//! phases, failure propagation, checkpoints and resume.

use infra_lifecycle::config::{load_config_from_file, save_config_to_file, validate_run_config};
use infra_lifecycle::orchestrator::checkpoint::{checkpoint_path, load_checkpoint};
use infra_lifecycle::providers::BOOTSTRAP_IGNITION_LOCATION;
use infra_lifecycle::{
    ClusterMetadata, HelperRegistry, InfraHelper, LogCollector, OrchestratorError, PhaseError,
    PhaseFuture, PhaseInput, PhaseOrchestrator, PhaseOutput, ProvisioningPhase, ResourceRef,
    RunConfig, RunError, RunStatus,
};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn new_run(provider: &str, metadata: ClusterMetadata) -> (PhaseOrchestrator, Arc<LogCollector>) {
    let log = Arc::new(LogCollector::in_memory());
    let orchestrator = PhaseOrchestrator::new(
        &HelperRegistry::with_builtin_providers(),
        provider,
        metadata,
        log.clone(),
    )
    .expect("builtin provider");
    (orchestrator, log)
}

// ============================================================================
// Provider data flow
// ============================================================================

#[tokio::test]
async fn test_aws_ignition_output_reaches_bootstrap_destroy() {
    let (mut orchestrator, log) = new_run(
        "aws",
        ClusterMetadata::new("dev", "dev-a1b2c").with_region("us-east-1"),
    );

    orchestrator.run().await.unwrap();

    let state = orchestrator.state();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.outputs["aws.region"], "us-east-1");
    assert_eq!(
        state.outputs[BOOTSTRAP_IGNITION_LOCATION],
        "s3://dev-a1b2c-bootstrap/bootstrap.ign"
    );
    assert!(log
        .lines()
        .iter()
        .any(|l| l.message.contains("removing bootstrap ignition at s3://dev-a1b2c")));
}

#[tokio::test]
async fn test_aws_missing_region_aborts_at_first_phase() {
    let (mut orchestrator, log) = new_run("aws", ClusterMetadata::new("dev", "dev-a1b2c"));

    let err = orchestrator.run().await.unwrap_err();

    // The helper's error comes back untouched
    assert_eq!(
        err,
        RunError::Phase(PhaseError::InvalidInput {
            provider: "aws".to_string(),
            phase: ProvisioningPhase::PreProvision,
            reason: "region is not set".to_string(),
        })
    );
    let state = orchestrator.state();
    assert_eq!(state.status, RunStatus::Failed);
    assert!(state.completed_phases.is_empty());
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_gcp_run_requires_project_label() {
    let metadata = ClusterMetadata::new("ci", "ci-9zz8y");

    let (mut missing, _) = new_run("gcp", metadata.clone());
    let err = missing.run().await.unwrap_err();
    assert_eq!(
        err.as_phase_error().map(|e| e.phase()),
        Some(ProvisioningPhase::PreProvision)
    );

    let (mut ok, log) = new_run("gcp", metadata.with_label("gcp.project_id", "ci-project"));
    ok.run().await.unwrap();
    assert_eq!(
        ok.state().outputs[BOOTSTRAP_IGNITION_LOCATION],
        "gs://ci-9zz8y-bootstrap-ignition/bootstrap.ign"
    );
    // pre-provision, ignition, post-provision
    assert_eq!(log.len(), 3);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_toml_config_drives_run_and_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let checkpoint_dir = temp_dir.path().join("state");
    let config_path = temp_dir.path().join("run.toml");

    fs::write(
        &config_path,
        format!(
            r#"
provider = "Azure"
log_level = "debug"
checkpoint_dir = '{}'

[cluster]
cluster_name = "prod"
infra_id = "prod-x7k2p"
region = "westeurope"
base_domain = "example.com"

[resources.vnet]
kind = "virtual-network"
id = "prod-vnet"
"#,
            checkpoint_dir.display()
        ),
    )
    .unwrap();

    let config = load_config_from_file(&config_path).unwrap();
    validate_run_config(&config).unwrap();

    let log = Arc::new(LogCollector::in_memory());
    let mut orchestrator =
        PhaseOrchestrator::from_config(&HelperRegistry::with_builtin_providers(), &config, log)
            .unwrap();
    assert_eq!(orchestrator.provider(), "azure");
    assert_eq!(
        orchestrator.state().resources["vnet"],
        ResourceRef::new("virtual-network", "prod-vnet")
    );

    orchestrator.run().await.unwrap();

    assert!(checkpoint_path(&checkpoint_dir).exists());
    let saved = load_checkpoint(&checkpoint_dir).unwrap().unwrap();
    assert_eq!(saved.status, RunStatus::Completed);
    assert_eq!(saved, *orchestrator.state());
}

#[test]
fn test_config_round_trips_through_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run.json");

    let mut config = RunConfig::default();
    config.provider = "gcp".to_string();
    config.cluster = ClusterMetadata::new("ci", "ci-9zz8y").with_label("gcp.project_id", "p");
    save_config_to_file(&config, &path).unwrap();

    assert_eq!(load_config_from_file(&path).unwrap(), config);
}

// ============================================================================
// Checkpoint and resume
// ============================================================================

/// Records every phase method that runs.
struct Recording {
    calls: Arc<Mutex<Vec<ProvisioningPhase>>>,
}

impl Recording {
    fn record<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(input.phase);
            Ok(PhaseOutput::default().with_output(format!("done.{}", input.phase), "yes"))
        })
    }
}

impl InfraHelper for Recording {
    fn provider(&self) -> &str {
        "recording"
    }

    fn pre_provision<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        self.record(input)
    }

    fn infra_ready<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        self.record(input)
    }

    fn ignition<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        self.record(input)
    }

    fn control_plane_available<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        self.record(input)
    }

    fn post_provision<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        self.record(input)
    }

    fn bootstrap_destroy<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        self.record(input)
    }

    fn post_destroy<'a>(&'a self, input: &'a PhaseInput) -> PhaseFuture<'a> {
        self.record(input)
    }
}

fn recording_registry(calls: Arc<Mutex<Vec<ProvisioningPhase>>>) -> HelperRegistry {
    let mut registry = HelperRegistry::new();
    registry
        .register("recording", move |_| {
            Box::new(Recording {
                calls: calls.clone(),
            })
        })
        .unwrap();
    registry
}

#[tokio::test]
async fn test_resume_continues_from_next_phase() {
    let temp_dir = TempDir::new().unwrap();
    let first_calls = Arc::new(Mutex::new(Vec::new()));

    let mut first = PhaseOrchestrator::new(
        &recording_registry(first_calls.clone()),
        "recording",
        ClusterMetadata::new("dev", "dev-a1b2c"),
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap()
    .with_checkpoint_dir(temp_dir.path());

    for phase in &ProvisioningPhase::ALL[..3] {
        first.run_phase(*phase).await.unwrap();
    }
    drop(first);

    let saved = load_checkpoint(temp_dir.path()).unwrap().unwrap();
    assert_eq!(saved.status, RunStatus::Running);
    assert_eq!(saved.next_phase(), Some(ProvisioningPhase::ControlPlaneAvailable));

    let resumed_calls = Arc::new(Mutex::new(Vec::new()));
    let mut resumed = PhaseOrchestrator::resume(
        &recording_registry(resumed_calls.clone()),
        saved,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();
    resumed.run().await.unwrap();

    assert_eq!(*first_calls.lock().unwrap(), ProvisioningPhase::ALL[..3].to_vec());
    assert_eq!(*resumed_calls.lock().unwrap(), ProvisioningPhase::ALL[3..].to_vec());

    let state = resumed.into_state();
    assert_eq!(state.status, RunStatus::Completed);
    // Outputs from before the checkpoint survive
    assert_eq!(state.outputs["done.pre-provision"], "yes");
    assert_eq!(state.outputs.len(), ProvisioningPhase::ALL.len());
}

#[tokio::test]
async fn test_unwritable_checkpoint_does_not_fail_run() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, "file in the way").unwrap();

    let (orchestrator, _) = new_run("none", ClusterMetadata::new("dev", "dev-a1b2c"));
    let mut orchestrator = orchestrator.with_checkpoint_dir(blocker.join("state"));

    orchestrator.run().await.unwrap();
    assert_eq!(orchestrator.state().status, RunStatus::Completed);
}

fn recording_config(checkpoint_dir: &std::path::Path) -> RunConfig {
    let mut config = RunConfig::default();
    config.provider = "recording".to_string();
    config.cluster = ClusterMetadata::new("dev", "dev-a1b2c");
    config.checkpoint_dir = Some(checkpoint_dir.to_path_buf());
    config
        .resources
        .insert("vnet".to_string(), ResourceRef::new("network", "dev-vnet"));
    config
}

#[tokio::test]
async fn test_start_or_resume_without_checkpoint_starts_fresh() {
    let temp_dir = TempDir::new().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let config = recording_config(temp_dir.path());

    let mut orchestrator = PhaseOrchestrator::start_or_resume(
        &recording_registry(calls.clone()),
        &config,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();

    assert_eq!(orchestrator.next_phase(), Some(ProvisioningPhase::PreProvision));
    assert_eq!(orchestrator.state().resources, config.resources);

    orchestrator.run().await.unwrap();
    assert_eq!(*calls.lock().unwrap(), ProvisioningPhase::ALL.to_vec());
    assert!(checkpoint_path(temp_dir.path()).exists());
}

#[tokio::test]
async fn test_start_or_resume_continues_running_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let config = recording_config(temp_dir.path());

    let first_calls = Arc::new(Mutex::new(Vec::new()));
    let mut first = PhaseOrchestrator::from_config(
        &recording_registry(first_calls),
        &config,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();
    first.run_phase(ProvisioningPhase::PreProvision).await.unwrap();
    first.run_phase(ProvisioningPhase::InfraReady).await.unwrap();
    drop(first);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut resumed = PhaseOrchestrator::start_or_resume(
        &recording_registry(calls.clone()),
        &config,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();
    assert_eq!(resumed.next_phase(), Some(ProvisioningPhase::Ignition));

    resumed.run().await.unwrap();
    assert_eq!(*calls.lock().unwrap(), ProvisioningPhase::ALL[2..].to_vec());

    // Progress keeps landing in the same checkpoint
    let saved = load_checkpoint(temp_dir.path()).unwrap().unwrap();
    assert_eq!(saved.status, RunStatus::Completed);
    assert_eq!(saved.resources["vnet"], ResourceRef::new("network", "dev-vnet"));
}

#[tokio::test]
async fn test_start_or_resume_refuses_cancelled_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let config = recording_config(temp_dir.path());

    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    let mut first = PhaseOrchestrator::from_config(
        &recording_registry(Arc::new(Mutex::new(Vec::new()))),
        &config,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap()
    .with_cancellation(cancel_rx);
    for phase in &ProvisioningPhase::ALL[..3] {
        first.run_phase(*phase).await.unwrap();
    }
    cancel_tx.send(true).unwrap();
    assert!(first.run().await.is_err());
    drop(first);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let result = PhaseOrchestrator::start_or_resume(
        &recording_registry(calls.clone()),
        &config,
        Arc::new(LogCollector::in_memory()),
    );

    assert!(matches!(result, Err(OrchestratorError::NotResumable(_))));
    assert!(calls.lock().unwrap().is_empty());
    let saved = load_checkpoint(temp_dir.path()).unwrap().unwrap();
    assert_eq!(saved.status, RunStatus::Cancelled);
    assert_eq!(saved.completed_phases, ProvisioningPhase::ALL[..3].to_vec());
}

#[tokio::test]
async fn test_start_or_resume_refuses_failed_and_completed_checkpoints() {
    let registry = HelperRegistry::with_builtin_providers();

    // aws without a region fails in pre-provision
    let failed_dir = TempDir::new().unwrap();
    let mut failed_config = RunConfig::default();
    failed_config.provider = "aws".to_string();
    failed_config.cluster = ClusterMetadata::new("dev", "dev-a1b2c");
    failed_config.checkpoint_dir = Some(failed_dir.path().to_path_buf());
    let mut failed = PhaseOrchestrator::from_config(
        &registry,
        &failed_config,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();
    assert!(failed.run().await.is_err());

    let done_dir = TempDir::new().unwrap();
    let mut done_config = failed_config.clone();
    done_config.provider = "none".to_string();
    done_config.checkpoint_dir = Some(done_dir.path().to_path_buf());
    let mut done =
        PhaseOrchestrator::from_config(&registry, &done_config, Arc::new(LogCollector::in_memory()))
            .unwrap();
    done.run().await.unwrap();

    for config in [&failed_config, &done_config] {
        let result =
            PhaseOrchestrator::start_or_resume(&registry, config, Arc::new(LogCollector::in_memory()));
        assert!(
            matches!(result, Err(OrchestratorError::NotResumable(_))),
            "{} checkpoint was not refused",
            config.provider
        );
    }
}

#[tokio::test]
async fn test_start_or_resume_rejects_checkpoint_for_other_cluster() {
    let temp_dir = TempDir::new().unwrap();
    let config = recording_config(temp_dir.path());
    let mut first = PhaseOrchestrator::from_config(
        &recording_registry(Arc::new(Mutex::new(Vec::new()))),
        &config,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();
    first.run_phase(ProvisioningPhase::PreProvision).await.unwrap();
    drop(first);

    let mut other_cluster = config.clone();
    other_cluster.cluster = ClusterMetadata::new("dev", "dev-zzzzz");
    let mut other_provider = config.clone();
    other_provider.provider = "none".to_string();

    let registry = recording_registry(Arc::new(Mutex::new(Vec::new())));

    for mismatched in [&other_cluster, &other_provider] {
        let result = PhaseOrchestrator::start_or_resume(
            &registry,
            mismatched,
            Arc::new(LogCollector::in_memory()),
        );
        assert!(matches!(result, Err(OrchestratorError::NotResumable(_))));
    }

    // Case and whitespace in the provider id do not count as a mismatch
    let mut same = config.clone();
    same.provider = " Recording ".to_string();
    let resumed =
        PhaseOrchestrator::start_or_resume(&registry, &same, Arc::new(LogCollector::in_memory()))
            .unwrap();
    assert_eq!(resumed.next_phase(), Some(ProvisioningPhase::InfraReady));
}

#[tokio::test]
async fn test_start_or_resume_keeps_checkpoint_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let config = recording_config(temp_dir.path());
    let mut first = PhaseOrchestrator::from_config(
        &recording_registry(Arc::new(Mutex::new(Vec::new()))),
        &config,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();
    first.run_phase(ProvisioningPhase::PreProvision).await.unwrap();
    drop(first);

    let mut edited = config.clone();
    edited.cluster.base_domain = "changed.example.com".to_string();
    edited
        .resources
        .insert("subnet".to_string(), ResourceRef::new("subnet", "dev-subnet"));

    let resumed = PhaseOrchestrator::start_or_resume(
        &recording_registry(Arc::new(Mutex::new(Vec::new()))),
        &edited,
        Arc::new(LogCollector::in_memory()),
    )
    .unwrap();

    assert_eq!(resumed.state().metadata, config.cluster);
    assert_eq!(resumed.state().resources, config.resources);
}
