//! Minimal checkpointed graph engine.
//!
//! Nodes execute one at a time against a shared [`SessionState`]; each
//! returns a [`StatePatch`] which is merged and checkpointed before the
//! edge table is consulted for the next node. Three primitives cover the
//! whole workflow:
//!
//! - node execution with a post-write checkpoint,
//! - typed partial-state merge,
//! - interrupt-before-node markers with guards.
//!
//! An interrupt marker fires only when its guard approves the current
//! state, and only on arrival from a *different* node, so a self-looping
//! node (the coder) does not re-interrupt on every pass. Resuming skips
//! the first interrupt check, which is what lets execution move past the
//! point it halted at.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{EngineError, ErrorRecord, Result};
use crate::state::{SessionState, Stage, StatePatch};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reserved terminal marker in the edge table
pub const END: &str = "__end__";

/// An atomic unit of work in the graph
#[async_trait::async_trait]
pub trait WorkflowNode: Send + Sync {
    fn name(&self) -> &'static str;

    /// Execute against the current state and return a partial update
    async fn run(&self, state: &SessionState) -> Result<StatePatch>;
}

/// Where execution goes after a node completes
pub enum Next {
    /// Unconditional or predicate-selected transition
    Node(&'static str),
    /// Terminate the run successfully
    End,
    /// Terminate the run as failed with the given record
    Fail(ErrorRecord),
}

type Router = Box<dyn Fn(&SessionState) -> Next + Send + Sync>;
type InterruptGuard = Box<dyn Fn(&SessionState) -> bool + Send + Sync>;

/// A compiled workflow: node registry, edge table, interrupt markers.
pub struct Workflow {
    entry: &'static str,
    nodes: HashMap<&'static str, Arc<dyn WorkflowNode>>,
    routers: HashMap<&'static str, Router>,
    interrupt_before: HashMap<&'static str, InterruptGuard>,
    /// Stage recorded in state when a node is about to execute
    stages: HashMap<&'static str, Stage>,
    /// Producer node re-run when feedback arrives at an interrupt point
    feedback_targets: HashMap<&'static str, &'static str>,
}

impl Workflow {
    pub fn new(entry: &'static str) -> Self {
        Self {
            entry,
            nodes: HashMap::new(),
            routers: HashMap::new(),
            interrupt_before: HashMap::new(),
            stages: HashMap::new(),
            feedback_targets: HashMap::new(),
        }
    }

    pub fn add_node(mut self, node: Arc<dyn WorkflowNode>, stage: Stage) -> Self {
        self.stages.insert(node.name(), stage);
        self.nodes.insert(node.name(), node);
        self
    }

    pub fn add_router(
        mut self,
        from: &'static str,
        router: impl Fn(&SessionState) -> Next + Send + Sync + 'static,
    ) -> Self {
        self.routers.insert(from, Box::new(router));
        self
    }

    /// Halt before `node` whenever `guard` approves the state
    pub fn interrupt_before(
        mut self,
        node: &'static str,
        guard: impl Fn(&SessionState) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.interrupt_before.insert(node, Box::new(guard));
        self
    }

    /// Re-run `producer` instead of `node` when a resume carries feedback
    pub fn feedback_target(mut self, node: &'static str, producer: &'static str) -> Self {
        self.feedback_targets.insert(node, producer);
        self
    }

    pub fn entry(&self) -> &'static str {
        self.entry
    }

    fn node(&self, name: &str) -> Result<&Arc<dyn WorkflowNode>> {
        self.nodes
            .get(name)
            .ok_or_else(|| EngineError::State(format!("unknown workflow node '{name}'")))
    }
}

/// How a drive through the graph ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Done,
    Interrupted { stage: Stage },
    Failed(ErrorRecord),
}

/// Final state plus how the run ended
#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub state: SessionState,
}

/// Drives a [`Workflow`] from a starting state to completion, an interrupt
/// or a failure, checkpointing after every node.
pub struct Engine {
    checkpoints: CheckpointStore,
}

impl Engine {
    pub fn new(checkpoints: CheckpointStore) -> Self {
        Self { checkpoints }
    }

    /// Run a fresh session from the workflow entry node.
    pub async fn run(&self, workflow: &Workflow, state: SessionState) -> Result<RunOutcome> {
        self.drive(workflow, state, workflow.entry(), false).await
    }

    /// Resume a checkpointed session.
    ///
    /// Feedback re-enters the producer of the artifact under review rather
    /// than the node about to run; without feedback, execution continues
    /// from exactly the node that was about to run, moving past the
    /// interrupt point it halted at.
    pub async fn resume(
        &self,
        workflow: &Workflow,
        checkpoint: Checkpoint,
        feedback: Option<String>,
    ) -> Result<RunOutcome> {
        let mut state = checkpoint.state;
        let feedback = feedback.filter(|f| !f.trim().is_empty());
        let mut next = checkpoint.next_node.as_str();

        if let Some(text) = feedback {
            state.feedback = Some(text);
            if checkpoint.interrupted
                && let Some(producer) = workflow.feedback_targets.get(next)
            {
                info!(
                    interrupted_before = next,
                    producer, "feedback routes back to the artifact producer"
                );
                next = producer;
            }
        }

        // the first node of a resume always runs without re-checking its
        // interrupt marker: whether the run halted there, failed there, or
        // the node is the feedback producer (which may carry a marker of
        // its own, as the architect does)
        let next = next.to_string();
        self.drive(workflow, state, &next, true).await
    }

    async fn drive(
        &self,
        workflow: &Workflow,
        mut state: SessionState,
        start: &str,
        mut skip_interrupt: bool,
    ) -> Result<RunOutcome> {
        let mut current = start.to_string();
        let mut previous: Option<String> = None;

        loop {
            if current == END {
                let checkpoint = Checkpoint::new(state.clone(), END, false);
                self.checkpoints.save(&checkpoint).await?;
                return Ok(RunOutcome {
                    status: RunStatus::Done,
                    state,
                });
            }

            // interrupt-before marker: skipped when resuming onto this node
            // and on self-loop re-entry
            if !skip_interrupt
                && previous.as_deref() != Some(current.as_str())
                && let Some(guard) = workflow.interrupt_before.get(current.as_str())
                && guard(&state)
            {
                if let Some(stage) = workflow.stages.get(current.as_str()) {
                    state.stage = *stage;
                }
                let checkpoint = Checkpoint::new(state.clone(), current.as_str(), true);
                self.checkpoints.save(&checkpoint).await?;
                info!(session_id = %state.session_id, node = %current, "execution interrupted for human review");
                return Ok(RunOutcome {
                    status: RunStatus::Interrupted { stage: state.stage },
                    state,
                });
            }
            skip_interrupt = false;

            let node = workflow.node(&current)?;
            if let Some(stage) = workflow.stages.get(current.as_str()) {
                state.stage = *stage;
            }
            info!(session_id = %state.session_id, node = %current, stage = %state.stage, "executing node");

            match node.run(&state).await {
                Ok(patch) => {
                    state.last_error = None;
                    state.apply(patch);
                }
                Err(err) => {
                    error!(session_id = %state.session_id, node = %current, "node failed: {err}");
                    let record = err.to_record(&current);
                    state.last_error = Some(record.clone());
                    // resume re-executes the failing node
                    let checkpoint = Checkpoint::new(state.clone(), current.as_str(), false);
                    self.checkpoints.save(&checkpoint).await?;
                    return Ok(RunOutcome {
                        status: RunStatus::Failed(record),
                        state,
                    });
                }
            }

            let next = match workflow.routers.get(current.as_str()) {
                Some(route) => route(&state),
                None => Next::End,
            };

            // the post-node checkpoint records where execution continues,
            // so a crash from here on resumes at the next unfinished node
            match next {
                Next::Node(name) => {
                    let checkpoint = Checkpoint::new(state.clone(), name, false);
                    self.checkpoints.save(&checkpoint).await?;
                    previous = Some(std::mem::replace(&mut current, name.to_string()));
                }
                Next::End => {
                    previous = Some(std::mem::replace(&mut current, END.to_string()));
                }
                Next::Fail(record) => {
                    warn!(session_id = %state.session_id, "run failed: {record}");
                    state.last_error = Some(record.clone());
                    let checkpoint = Checkpoint::new(state.clone(), current.as_str(), false);
                    self.checkpoints.save(&checkpoint).await?;
                    return Ok(RunOutcome {
                        status: RunStatus::Failed(record),
                        state,
                    });
                }
            }
        }
    }
}
