//! Command-surface behavior: exit codes and read-only guarantees.

use autodev::checkpoint::{Checkpoint, CheckpointStore};
use autodev::cli::args::ArtifactKind;
use autodev::cli::commands;
use autodev::config::Config;
use autodev::state::SessionState;
use autodev::worker::ValidationMode;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn test_config(data_root: &Path, workspace_root: &Path) -> Config {
    Config {
        api_key: None,
        base_url: "https://api.anthropic.com".to_string(),
        default_model: "test-model".to_string(),
        pm_model: None,
        architect_model: None,
        coder_model: None,
        workspace_root: workspace_root.to_path_buf(),
        data_root: data_root.to_path_buf(),
        max_coding_iterations: 50,
        human_in_loop: false,
        worker_binary: "definitely-not-a-real-binary".to_string(),
        worker_timeout: Duration::from_secs(300),
        validation_mode: ValidationMode::Lenient,
        success_markers: None,
        failure_markers: None,
    }
}

async fn seed_session(data_root: &Path, workspace: PathBuf) -> Checkpoint {
    tokio::fs::create_dir_all(&workspace).await.unwrap();
    tokio::fs::write(workspace.join("PRD.md"), "# PRD\n")
        .await
        .unwrap();
    let mut state = SessionState::new("seeded", "a requirement", workspace.clone());
    state.prd_path = Some(workspace.join("PRD.md"));
    let checkpoint = Checkpoint::new(state, "architect", true);
    CheckpointStore::new(data_root)
        .save(&checkpoint)
        .await
        .unwrap();
    checkpoint
}

#[tokio::test]
async fn test_status_unknown_session_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("data"), &dir.path().join("ws"));

    let code = commands::status(&config, "missing".to_string()).await;
    assert_eq!(code, commands::EXIT_UNKNOWN_SESSION);
}

#[tokio::test]
async fn test_status_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let data_root = dir.path().join("data");
    let config = test_config(&data_root, &dir.path().join("ws"));
    seed_session(&data_root, dir.path().join("ws").join("seeded")).await;

    let checkpoint_file = data_root.join("checkpoints").join("seeded.json");
    let before = tokio::fs::read(&checkpoint_file).await.unwrap();

    assert_eq!(commands::status(&config, "seeded".to_string()).await, 0);
    assert_eq!(commands::status(&config, "seeded".to_string()).await, 0);

    let after = tokio::fs::read(&checkpoint_file).await.unwrap();
    assert_eq!(before, after, "status must not mutate the checkpoint");
}

#[tokio::test]
async fn test_show_prints_artifact_and_flags_missing_ones() {
    let dir = tempfile::tempdir().unwrap();
    let data_root = dir.path().join("data");
    let config = test_config(&data_root, &dir.path().join("ws"));
    seed_session(&data_root, dir.path().join("ws").join("seeded")).await;

    let code = commands::show(&config, "seeded".to_string(), ArtifactKind::Prd).await;
    assert_eq!(code, commands::EXIT_DONE);

    // the design was never produced
    let code = commands::show(&config, "seeded".to_string(), ArtifactKind::Design).await;
    assert_eq!(code, commands::EXIT_MISSING_ARTIFACT);

    let code = commands::show(&config, "missing".to_string(), ArtifactKind::Prd).await;
    assert_eq!(code, commands::EXIT_UNKNOWN_SESSION);
}

#[tokio::test]
async fn test_list_sessions_includes_seeded_session() {
    let dir = tempfile::tempdir().unwrap();
    let data_root = dir.path().join("data");
    let config = test_config(&data_root, &dir.path().join("ws"));
    seed_session(&data_root, dir.path().join("ws").join("seeded")).await;

    assert_eq!(commands::list_sessions(&config).await, commands::EXIT_DONE);
}

#[tokio::test]
async fn test_start_fails_fast_without_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("data"), &dir.path().join("ws"));

    let code = commands::start(&config, "build it".to_string(), false, None, false).await;
    assert_eq!(code, commands::EXIT_FAILED);
}

#[tokio::test]
async fn test_start_fails_fast_when_worker_binary_missing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir.path().join("data"), &dir.path().join("ws"));
    config.api_key = Some("sk-test".to_string());

    // API key present, but the coding CLI is not on PATH
    let code = commands::start(&config, "build it".to_string(), false, None, false).await;
    assert_eq!(code, commands::EXIT_FAILED);
}

#[tokio::test]
async fn test_start_rejects_missing_project_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir.path().join("data"), &dir.path().join("ws"));
    config.api_key = Some("sk-test".to_string());
    config.worker_binary = "sh".to_string();

    let code = commands::start(
        &config,
        "build it".to_string(),
        false,
        Some(dir.path().join("does-not-exist")),
        false,
    )
    .await;
    assert_eq!(code, commands::EXIT_FAILED);
}

#[tokio::test]
async fn test_continue_unknown_session_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("data"), &dir.path().join("ws"));

    let code = commands::resume(&config, "missing".to_string(), None).await;
    assert_eq!(code, commands::EXIT_UNKNOWN_SESSION);
}
