//! Command implementations and exit-code mapping.
//!
//! Exit codes: 0 done, 1 failed, 2 interrupted, 3 unknown session or state
//! error, 4 missing artifact.

use crate::artifacts::ArtifactStore;
use crate::checkpoint::CheckpointStore;
use crate::cli::args::ArtifactKind;
use crate::config::{Config, PlannerRole};
use crate::env::artifacts;
use crate::error::EngineError;
use crate::llm::AnthropicPlanner;
use crate::state::SessionState;
use crate::task::TaskStatus;
use crate::worker::ClaudeCliWorker;
use crate::workflow::{Engine, GraphDeps, RunOutcome, RunStatus, build_workflow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const EXIT_DONE: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_INTERRUPTED: i32 = 2;
pub const EXIT_UNKNOWN_SESSION: i32 = 3;
pub const EXIT_MISSING_ARTIFACT: i32 = 4;

/// `start <requirement>`
pub async fn start(
    config: &Config,
    requirement: String,
    human_loop: bool,
    project_dir: Option<PathBuf>,
    batch_coding: bool,
) -> i32 {
    if let Err(e) = preflight(config) {
        return fail_fast(&e);
    }
    if let Some(dir) = &project_dir
        && !dir.is_dir()
    {
        return fail_fast(&EngineError::Config(format!(
            "project directory {} does not exist",
            dir.display()
        )));
    }

    let session_id = Uuid::new_v4().to_string();
    let workspace = absolutize(&config.workspace_root).join(&session_id);
    let mut state = SessionState::new(session_id.clone(), requirement, workspace.clone());
    state.human_in_loop = human_loop || config.human_in_loop;
    state.batch_coding = batch_coding;
    state.project_dir = project_dir.map(|dir| absolutize(&dir));

    let store = ArtifactStore::new(workspace);
    if let Err(e) = store.init().await {
        return fail_fast(&e);
    }

    info!(session_id = %session_id, "session created");
    println!("Session {session_id}");

    let (engine, workflow) = match build_engine(config, store) {
        Ok(parts) => parts,
        Err(e) => return fail_fast(&e),
    };
    match engine.run(&workflow, state).await {
        Ok(outcome) => report(&outcome),
        Err(e) => fail_fast(&e),
    }
}

/// `continue <session_id>`
pub async fn resume(config: &Config, session_id: String, feedback: Option<String>) -> i32 {
    let checkpoints = CheckpointStore::new(&config.data_root);
    let checkpoint = match checkpoints.load(&session_id).await {
        Ok(checkpoint) => checkpoint,
        Err(e) => {
            eprintln!("{e}");
            return EXIT_UNKNOWN_SESSION;
        }
    };

    if let Err(e) = preflight(config) {
        return fail_fast(&e);
    }

    let store = ArtifactStore::new(checkpoint.state.workspace_path.clone());
    let (engine, workflow) = match build_engine(config, store) {
        Ok(parts) => parts,
        Err(e) => return fail_fast(&e),
    };
    match engine.resume(&workflow, checkpoint, feedback).await {
        Ok(outcome) => report(&outcome),
        Err(e) => {
            eprintln!("{e}");
            match e {
                EngineError::State(_) => EXIT_UNKNOWN_SESSION,
                _ => EXIT_FAILED,
            }
        }
    }
}

/// `status <session_id>` — read-only
pub async fn status(config: &Config, session_id: String) -> i32 {
    let checkpoints = CheckpointStore::new(&config.data_root);
    let checkpoint = match checkpoints.load(&session_id).await {
        Ok(checkpoint) => checkpoint,
        Err(e) => {
            eprintln!("{e}");
            return EXIT_UNKNOWN_SESSION;
        }
    };

    let state = &checkpoint.state;
    println!("session:  {}", state.session_id);
    println!("stage:    {}", state.stage);
    println!("created:  {}", state.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let total = state.tasks.len();
    if total > 0 {
        let count = |status: TaskStatus| {
            state
                .tasks
                .iter()
                .filter(|task| task.status == status)
                .count()
        };
        println!(
            "tasks:    {total} total, {} completed, {} blocked, {} pending",
            count(TaskStatus::Completed),
            count(TaskStatus::Blocked),
            count(TaskStatus::Pending)
        );
    }
    match &state.last_error {
        Some(record) => println!("error:    {record}"),
        None => println!("error:    none"),
    }
    EXIT_DONE
}

/// `show <session_id> --artifact <kind>` — read-only
pub async fn show(config: &Config, session_id: String, artifact: ArtifactKind) -> i32 {
    let checkpoints = CheckpointStore::new(&config.data_root);
    let checkpoint = match checkpoints.load(&session_id).await {
        Ok(checkpoint) => checkpoint,
        Err(e) => {
            eprintln!("{e}");
            return EXIT_UNKNOWN_SESSION;
        }
    };

    let state = &checkpoint.state;
    let (recorded, default_name) = match artifact {
        ArtifactKind::Prd => (&state.prd_path, artifacts::PRD_FILE_NAME),
        ArtifactKind::Design => (&state.design_path, artifacts::DESIGN_FILE_NAME),
        ArtifactKind::Tasks => (&state.tasks_path, artifacts::TASKS_FILE_NAME),
    };
    let path = recorded
        .clone()
        .unwrap_or_else(|| state.workspace_path.join(default_name));

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => {
            print!("{content}");
            EXIT_DONE
        }
        Err(_) => {
            eprintln!("artifact not produced yet: {}", path.display());
            EXIT_MISSING_ARTIFACT
        }
    }
}

/// `list-sessions`
pub async fn list_sessions(config: &Config) -> i32 {
    let checkpoints = CheckpointStore::new(&config.data_root);
    match checkpoints.list().await {
        Ok(sessions) => {
            for session in sessions {
                println!(
                    "{}  {}  {}",
                    session.session_id,
                    session.stage,
                    session.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            EXIT_DONE
        }
        Err(e) => {
            eprintln!("{e}");
            EXIT_FAILED
        }
    }
}

fn preflight(config: &Config) -> Result<(), EngineError> {
    config.require_api_key()?;
    config.require_worker_binary()?;
    config.ensure_roots()?;
    Ok(())
}

fn build_engine(config: &Config, store: ArtifactStore) -> Result<(Engine, crate::workflow::Workflow), EngineError> {
    let api_key = config.require_api_key()?;
    let planner = Arc::new(AnthropicPlanner::new(api_key, config.base_url.clone()));
    let worker = Arc::new(ClaudeCliWorker::new(config.worker_config()));

    let workflow = build_workflow(GraphDeps {
        planner,
        worker,
        store,
        pm_model: config.planner_model(PlannerRole::Pm).to_string(),
        reviewer_model: config.planner_model(PlannerRole::Reviewer).to_string(),
        architect_model: config.planner_model(PlannerRole::Architect).to_string(),
        max_coding_iterations: config.max_coding_iterations,
    });
    let engine = Engine::new(CheckpointStore::new(&config.data_root));
    Ok((engine, workflow))
}

/// Map a run outcome to user output and an exit code
fn report(outcome: &RunOutcome) -> i32 {
    let session_id = &outcome.state.session_id;
    match &outcome.status {
        RunStatus::Done => {
            println!("Session {session_id} completed (stage: {})", outcome.state.stage);
            EXIT_DONE
        }
        RunStatus::Interrupted { stage } => {
            println!("Session {session_id} paused before stage '{stage}' for review.");
            println!("Inspect artifacts with 'autodev show {session_id} --artifact prd'");
            println!("then resume with 'autodev continue {session_id} [--feedback <text>]'.");
            EXIT_INTERRUPTED
        }
        RunStatus::Failed(record) => {
            eprintln!("[{}] {} (session: {session_id})", record.kind, record.message);
            EXIT_FAILED
        }
    }
}

fn fail_fast(error: &EngineError) -> i32 {
    eprintln!("{error}");
    EXIT_FAILED
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}
