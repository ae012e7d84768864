//! Claude Code CLI child-process adapter.
//!
//! Spawns `claude --add-dir <dir> --permission-mode <mode> -p <prompt>` per
//! task, captures stdout/stderr, enforces a wall-clock timeout and
//! classifies the outcome. On Unix the child gets its own process group so
//! a timeout kills the whole tree, not just the CLI front process.
//!
//! For reproducibility every invocation leaves an audit trail next to the
//! session logs: the exact command as a `command.sh`, the captured
//! `stdout.txt`/`stderr.txt`, and a timestamped activity log.

use crate::worker::outcome::{FailureReason, MarkerSet, ValidationMode, WorkerOutcome, classify};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// One coding job handed to the worker
#[derive(Debug, Clone)]
pub struct WorkerInvocation {
    /// Task id, used to name the audit files
    pub task_id: String,
    /// Full prompt (PRD + design + task description)
    pub prompt: String,
    /// Working directory of the child process
    pub work_dir: PathBuf,
    /// Directory passed via `--add-dir`; typically equals `work_dir`
    pub add_dir: PathBuf,
    /// Audit-log directory; no audit files are written when unset
    pub log_dir: Option<PathBuf>,
}

/// Seam between the coder node and the external process. The production
/// implementation is [`ClaudeCliWorker`]; tests substitute a scripted fake.
#[async_trait]
pub trait TaskWorker: Send + Sync {
    async fn execute(&self, job: WorkerInvocation) -> WorkerOutcome;
}

/// Adapter configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Binary name or path, resolved through `PATH`
    pub binary: String,
    /// Value for `--permission-mode`
    pub permission_mode: String,
    /// Optional `--model` forwarded to the CLI
    pub model: Option<String>,
    pub timeout: Duration,
    pub validation_mode: ValidationMode,
    pub markers: MarkerSet,
    /// Cap on captured bytes per stream
    pub max_capture_bytes: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            permission_mode: "acceptEdits".to_string(),
            model: None,
            timeout: Duration::from_secs(300),
            validation_mode: ValidationMode::Lenient,
            markers: MarkerSet::default(),
            max_capture_bytes: 1024 * 1024,
        }
    }
}

/// Production worker: runs the Claude Code CLI headlessly.
#[derive(Debug, Clone)]
pub struct ClaudeCliWorker {
    config: WorkerConfig,
}

impl ClaudeCliWorker {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, job: &WorkerInvocation) -> Vec<String> {
        let mut args = vec![
            "--add-dir".to_string(),
            job.add_dir.display().to_string(),
            "--permission-mode".to_string(),
            self.config.permission_mode.clone(),
        ];
        if let Some(ref model) = self.config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.push("-p".to_string());
        args.push(job.prompt.clone());
        args
    }

    /// Save the exact command for replay, shell-escaped.
    async fn write_command_file(&self, job: &WorkerInvocation, args: &[String]) {
        let Some(ref log_dir) = job.log_dir else {
            return;
        };
        let escaped: Vec<String> = args
            .iter()
            .map(|a| shell_escape::escape(a.clone().into()).into_owned())
            .collect();
        let script = format!(
            "#!/bin/sh\n# Worker command - task {}\n# Generated: {}\ncd {}\n{} {}\n",
            job.task_id,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            shell_escape::escape(job.work_dir.display().to_string().into()),
            self.config.binary,
            escaped.join(" ")
        );
        let path = log_dir.join(format!("{}.command.sh", job.task_id));
        if let Err(e) = tokio::fs::write(&path, script).await {
            warn!("failed to write worker command file: {e}");
        }
    }

    async fn append_log(&self, job: &WorkerInvocation, message: &str) {
        let Some(ref log_dir) = job.log_dir else {
            return;
        };
        let path = log_dir.join(format!("{}.log", job.task_id));
        let line = format!("[{}] {message}\n", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"));
        match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                let _ = file.write_all(line.as_bytes()).await;
            }
            Err(e) => warn!("failed to open worker log: {e}"),
        }
    }

    async fn write_capture_files(&self, job: &WorkerInvocation, stdout: &str, stderr: &str) {
        let Some(ref log_dir) = job.log_dir else {
            return;
        };
        if !stdout.is_empty() {
            let path = log_dir.join(format!("{}.stdout.txt", job.task_id));
            if let Err(e) = tokio::fs::write(&path, stdout).await {
                warn!("failed to write worker stdout capture: {e}");
            }
        }
        if !stderr.is_empty() {
            let path = log_dir.join(format!("{}.stderr.txt", job.task_id));
            if let Err(e) = tokio::fs::write(&path, stderr).await {
                warn!("failed to write worker stderr capture: {e}");
            }
        }
    }

    fn truncate(&self, bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        if text.len() <= self.config.max_capture_bytes {
            return text.into_owned();
        }
        let mut cut = self.config.max_capture_bytes;
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated]", &text[..cut])
    }
}

#[async_trait]
impl TaskWorker for ClaudeCliWorker {
    async fn execute(&self, job: WorkerInvocation) -> WorkerOutcome {
        let args = self.build_args(&job);
        self.write_command_file(&job, &args).await;
        self.append_log(
            &job,
            &format!(
                "executing {} with {} args (timeout {}s, mode {})",
                self.config.binary,
                args.len(),
                self.config.timeout.as_secs(),
                self.config.validation_mode
            ),
        )
        .await;

        let mut command = Command::new(&self.config.binary);
        command
            .args(&args)
            .current_dir(&job.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a timeout kill takes descendants down with the
        // CLI process, not just the direct child.
        #[cfg(unix)]
        command.process_group(0);

        let start = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, command.output()).await;
        let elapsed = (start.elapsed().as_secs_f64() * 100.0).round() / 100.0;

        let outcome = match result {
            Err(_) => {
                self.append_log(&job, &format!("timed out after {elapsed}s; process tree killed"))
                    .await;
                WorkerOutcome {
                    success: false,
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: None,
                    elapsed,
                    reason: Some(FailureReason::Timeout),
                }
            }
            Ok(Err(e)) => {
                self.append_log(&job, &format!("failed to spawn worker: {e}")).await;
                WorkerOutcome {
                    success: false,
                    stdout: String::new(),
                    stderr: format!("failed to spawn '{}': {e}", self.config.binary),
                    exit_code: None,
                    elapsed,
                    reason: Some(FailureReason::SpawnFailed),
                }
            }
            Ok(Ok(output)) => {
                let stdout = self.truncate(&output.stdout);
                let stderr = self.truncate(&output.stderr);
                let exit_code = output.status.code();
                let (success, reason) = classify(
                    exit_code,
                    false,
                    &stdout,
                    self.config.validation_mode,
                    &self.config.markers,
                );
                self.append_log(
                    &job,
                    &format!(
                        "completed in {elapsed}s | exit {exit_code:?} | stdout {} bytes | stderr {} bytes | success={success}",
                        output.stdout.len(),
                        output.stderr.len()
                    ),
                )
                .await;
                self.write_capture_files(&job, &stdout, &stderr).await;
                WorkerOutcome {
                    success,
                    stdout,
                    stderr,
                    exit_code,
                    elapsed,
                    reason,
                }
            }
        };

        debug!(
            task_id = %job.task_id,
            success = outcome.success,
            reason = ?outcome.reason,
            "worker invocation finished"
        );
        outcome
    }
}
