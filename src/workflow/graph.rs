//! AutoDev workflow wiring.
//!
//! ```text
//! pm_draft ──> review_pm ──> review_dev ──> review_qa ──> pm_revise
//!     ──> (interrupt) architect ──> (interrupt) coder ──┐
//!                          ^                            │ loop while eligible
//!                          └── feedback on resume       v
//!                                                    finish ──> END
//! ```
//!
//! The three reviewers are logically parallel (each writes a disjoint
//! `reviews[role]` key, so completion order does not matter) and are
//! executed sequentially; `pm_revise` joins the fan-in by requiring all
//! three reviews in state.
//!
//! Feedback on resume re-enters the producer of the artifact under review:
//! the PRD producer (`pm_revise`) when halted before `architect`, the
//! design producer (`architect`) when halted before `coder`.

use crate::agents::{ArchitectNode, CoderNode, PmDraftNode, PmReviseNode, ReviewerNode};
use crate::artifacts::ArtifactStore;
use crate::error::{ErrorRecord, Result};
use crate::llm::PlannerModel;
use crate::state::{ReviewRole, SessionState, Stage, StatePatch};
use crate::task::TaskList;
use crate::worker::TaskWorker;
use crate::workflow::engine::{Next, Workflow, WorkflowNode};
use std::sync::Arc;

/// Everything the graph needs that outlives a single run
pub struct GraphDeps {
    pub planner: Arc<dyn PlannerModel>,
    pub worker: Arc<dyn TaskWorker>,
    pub store: ArtifactStore,
    pub pm_model: String,
    pub reviewer_model: String,
    pub architect_model: String,
    pub max_coding_iterations: u32,
}

/// Terminal sink: reaching it marks the session done.
struct FinishNode;

#[async_trait::async_trait]
impl WorkflowNode for FinishNode {
    fn name(&self) -> &'static str {
        "finish"
    }

    async fn run(&self, _state: &SessionState) -> Result<StatePatch> {
        Ok(StatePatch::default())
    }
}

/// Build the development workflow over the given collaborators.
pub fn build_workflow(deps: GraphDeps) -> Workflow {
    let max_iterations = deps.max_coding_iterations;

    Workflow::new("pm_draft")
        .add_node(
            Arc::new(PmDraftNode::new(
                deps.planner.clone(),
                deps.store.clone(),
                deps.pm_model.clone(),
            )),
            Stage::PmDraft,
        )
        .add_node(
            Arc::new(ReviewerNode::new(
                ReviewRole::Pm,
                deps.planner.clone(),
                deps.store.clone(),
                deps.reviewer_model.clone(),
            )),
            Stage::PmReview,
        )
        .add_node(
            Arc::new(ReviewerNode::new(
                ReviewRole::Dev,
                deps.planner.clone(),
                deps.store.clone(),
                deps.reviewer_model.clone(),
            )),
            Stage::PmReview,
        )
        .add_node(
            Arc::new(ReviewerNode::new(
                ReviewRole::Qa,
                deps.planner.clone(),
                deps.store.clone(),
                deps.reviewer_model.clone(),
            )),
            Stage::PmReview,
        )
        .add_node(
            Arc::new(PmReviseNode::new(
                deps.planner.clone(),
                deps.store.clone(),
                deps.pm_model,
            )),
            Stage::PmRevise,
        )
        .add_node(
            Arc::new(ArchitectNode::new(
                deps.planner,
                deps.store.clone(),
                deps.architect_model,
            )),
            Stage::Architect,
        )
        .add_node(
            Arc::new(CoderNode::new(deps.worker, deps.store)),
            Stage::Coding,
        )
        .add_node(Arc::new(FinishNode), Stage::Done)
        // reviewer fan-out, serialized; joins at pm_revise once all three
        // reviews landed
        .add_router("pm_draft", |_| Next::Node("review_pm"))
        .add_router("review_pm", |_| Next::Node("review_dev"))
        .add_router("review_dev", |_| Next::Node("review_qa"))
        .add_router("review_qa", |_| Next::Node("pm_revise"))
        .add_router("pm_revise", |_| Next::Node("architect"))
        // an empty task list terminates without ever entering the coder
        .add_router("architect", |state| {
            if state.tasks.is_empty() {
                Next::Node("finish")
            } else {
                Next::Node("coder")
            }
        })
        .add_router("coder", move |state| {
            let list = TaskList::new(state.tasks.to_vec());
            if !list.has_pending() {
                return Next::Node("finish");
            }
            if state.iterations >= max_iterations {
                return Next::Fail(ErrorRecord::iteration_cap(state.iterations, max_iterations));
            }
            Next::Node("coder")
        })
        .add_router("finish", |_| Next::End)
        .interrupt_before("architect", |state| state.human_in_loop)
        .interrupt_before("coder", |state| state.human_in_loop && !state.batch_coding)
        .feedback_target("architect", "pm_revise")
        .feedback_target("coder", "architect")
}
