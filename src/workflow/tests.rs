#[cfg(test)]
mod tests {
    use crate::checkpoint::CheckpointStore;
    use crate::error::{EngineError, Result};
    use crate::state::{ReviewRole, SessionState, Stage, StatePatch};
    use crate::workflow::engine::{Engine, Next, RunStatus, Workflow, WorkflowNode};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Toy node that logs executions and can fail a fixed number of times
    struct TestNode {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        failures: Mutex<u32>,
        clears_feedback: bool,
        bumps_iterations: bool,
    }

    impl TestNode {
        fn new(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                log,
                failures: Mutex::new(0),
                clears_feedback: false,
                bumps_iterations: false,
            })
        }

        fn failing(name: &'static str, log: Arc<Mutex<Vec<String>>>, times: u32) -> Arc<Self> {
            Arc::new(Self {
                name,
                log,
                failures: Mutex::new(times),
                clears_feedback: false,
                bumps_iterations: false,
            })
        }

        fn producer(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                log,
                failures: Mutex::new(0),
                clears_feedback: true,
                bumps_iterations: false,
            })
        }

        fn looping(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                log,
                failures: Mutex::new(0),
                clears_feedback: false,
                bumps_iterations: true,
            })
        }
    }

    #[async_trait::async_trait]
    impl WorkflowNode for TestNode {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, state: &SessionState) -> Result<StatePatch> {
            let mut entry = self.name.to_string();
            if let Some(feedback) = &state.feedback {
                entry.push_str(&format!("(feedback={feedback})"));
            }
            self.log.lock().unwrap().push(entry);

            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(EngineError::Llm("synthetic failure".to_string()));
            }

            let mut patch = StatePatch::default();
            if self.clears_feedback {
                patch.clear_feedback = true;
            }
            if self.bumps_iterations {
                patch.iterations = Some(state.iterations + 1);
            }
            Ok(patch)
        }
    }

    fn state(human_in_loop: bool) -> SessionState {
        let mut state = SessionState::new("wf-test", "requirement", PathBuf::from("/tmp/wf-test"));
        state.human_in_loop = human_in_loop;
        state
    }

    fn engine(dir: &tempfile::TempDir) -> Engine {
        Engine::new(CheckpointStore::new(dir.path()))
    }

    fn linear_workflow(log: &Arc<Mutex<Vec<String>>>) -> Workflow {
        Workflow::new("alpha")
            .add_node(TestNode::new("alpha", log.clone()), Stage::PmDraft)
            .add_node(TestNode::producer("beta", log.clone()), Stage::PmRevise)
            .add_node(TestNode::new("gamma", log.clone()), Stage::Architect)
            .add_node(TestNode::new("finish", log.clone()), Stage::Done)
            .add_router("alpha", |_| Next::Node("beta"))
            .add_router("beta", |_| Next::Node("gamma"))
            .add_router("gamma", |_| Next::Node("finish"))
            .add_router("finish", |_| Next::End)
            .interrupt_before("gamma", |s| s.human_in_loop)
            .feedback_target("gamma", "beta")
    }

    #[tokio::test]
    async fn test_linear_run_executes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = linear_workflow(&log);

        let outcome = engine(&dir).run(&workflow, state(false)).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(outcome.state.stage, Stage::Done);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["alpha", "beta", "gamma", "finish"]
        );
    }

    #[tokio::test]
    async fn test_checkpoint_written_after_every_node() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = linear_workflow(&log);
        let engine = engine(&dir);

        engine.run(&workflow, state(false)).await.unwrap();

        // final checkpoint reflects the terminal state and round-trips
        let store = CheckpointStore::new(dir.path());
        let checkpoint = store.load("wf-test").await.unwrap();
        assert_eq!(checkpoint.state.stage, Stage::Done);
        let reloaded = store.load("wf-test").await.unwrap();
        assert_eq!(reloaded, checkpoint);
    }

    #[tokio::test]
    async fn test_interrupt_halts_and_plain_resume_continues() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = linear_workflow(&log);
        let engine = engine(&dir);

        let outcome = engine.run(&workflow, state(true)).await.unwrap();
        assert_eq!(
            outcome.status,
            RunStatus::Interrupted {
                stage: Stage::Architect
            }
        );
        assert_eq!(*log.lock().unwrap(), vec!["alpha", "beta"]);

        let checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();
        assert!(checkpoint.interrupted);
        assert_eq!(checkpoint.next_node, "gamma");

        // resume without feedback: advances past the interrupt, nothing re-runs
        let outcome = engine.resume(&workflow, checkpoint, None).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["alpha", "beta", "gamma", "finish"]
        );
    }

    #[tokio::test]
    async fn test_resume_with_feedback_reruns_producer_then_interrupts_again() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = linear_workflow(&log);
        let engine = engine(&dir);

        engine.run(&workflow, state(true)).await.unwrap();
        let checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();

        let outcome = engine
            .resume(&workflow, checkpoint, Some("tighten scope".to_string()))
            .await
            .unwrap();
        // the producer re-ran with the feedback visible, then the interrupt
        // point fired again
        assert_eq!(
            outcome.status,
            RunStatus::Interrupted {
                stage: Stage::Architect
            }
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec!["alpha", "beta", "beta(feedback=tighten scope)"]
        );
        assert!(outcome.state.feedback.is_none(), "producer consumed feedback");

        // second plain resume reaches the end
        let checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();
        let outcome = engine.resume(&workflow, checkpoint, None).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
    }

    /// Mirror of the coder -> architect reroute: the feedback producer
    /// carries an interrupt marker of its own. It must still execute on
    /// resume (consuming the feedback) instead of re-halting at its own
    /// marker, and the run then halts at the next interrupt point.
    #[tokio::test]
    async fn test_feedback_producer_with_own_marker_still_runs() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = Workflow::new("alpha")
            .add_node(TestNode::new("alpha", log.clone()), Stage::PmRevise)
            .add_node(TestNode::producer("design", log.clone()), Stage::Architect)
            .add_node(TestNode::new("build", log.clone()), Stage::Coding)
            .add_node(TestNode::new("finish", log.clone()), Stage::Done)
            .add_router("alpha", |_| Next::Node("design"))
            .add_router("design", |_| Next::Node("build"))
            .add_router("build", |_| Next::Node("finish"))
            .add_router("finish", |_| Next::End)
            .interrupt_before("design", |s| s.human_in_loop)
            .interrupt_before("build", |s| s.human_in_loop)
            .feedback_target("build", "design");
        let engine = engine(&dir);
        let store = CheckpointStore::new(dir.path());

        // reach the halt before "build" (past the one before "design")
        let outcome = engine.run(&workflow, state(true)).await.unwrap();
        assert_eq!(
            outcome.status,
            RunStatus::Interrupted {
                stage: Stage::Architect
            }
        );
        let checkpoint = store.load("wf-test").await.unwrap();
        let outcome = engine.resume(&workflow, checkpoint, None).await.unwrap();
        assert_eq!(
            outcome.status,
            RunStatus::Interrupted {
                stage: Stage::Coding
            }
        );

        // feedback reroutes to "design", which runs despite its marker
        let checkpoint = store.load("wf-test").await.unwrap();
        let outcome = engine
            .resume(&workflow, checkpoint, Some("swap storage".to_string()))
            .await
            .unwrap();
        assert_eq!(
            outcome.status,
            RunStatus::Interrupted {
                stage: Stage::Coding
            },
            "halts at the next interrupt, not back at the producer's own marker"
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec!["alpha", "design", "design(feedback=swap storage)"]
        );
        assert!(outcome.state.feedback.is_none(), "producer consumed feedback");

        // plain resume finishes the run
        let checkpoint = store.load("wf-test").await.unwrap();
        let outcome = engine.resume(&workflow, checkpoint, None).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "alpha",
                "design",
                "design(feedback=swap storage)",
                "build",
                "finish"
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_feedback_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = linear_workflow(&log);
        let engine = engine(&dir);

        engine.run(&workflow, state(true)).await.unwrap();
        let checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();

        let outcome = engine
            .resume(&workflow, checkpoint, Some("   ".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["alpha", "beta", "gamma", "finish"]
        );
    }

    #[tokio::test]
    async fn test_node_failure_is_recorded_and_resume_retries_same_node() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = Workflow::new("alpha")
            .add_node(TestNode::new("alpha", log.clone()), Stage::PmDraft)
            .add_node(TestNode::failing("beta", log.clone(), 1), Stage::Architect)
            .add_node(TestNode::new("finish", log.clone()), Stage::Done)
            .add_router("alpha", |_| Next::Node("beta"))
            .add_router("beta", |_| Next::Node("finish"))
            .add_router("finish", |_| Next::End);
        let engine = engine(&dir);

        let outcome = engine.run(&workflow, state(false)).await.unwrap();
        let RunStatus::Failed(record) = outcome.status else {
            panic!("expected failure");
        };
        assert_eq!(record.kind, "llm");
        assert_eq!(record.node.as_deref(), Some("beta"));
        assert_eq!(outcome.state.last_error.as_ref(), Some(&record));

        // checkpoint points at the failing node; resume retries it
        let checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();
        assert!(!checkpoint.interrupted);
        assert_eq!(checkpoint.next_node, "beta");

        let outcome = engine.resume(&workflow, checkpoint, None).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert!(outcome.state.last_error.is_none(), "success clears the error");
        assert_eq!(*log.lock().unwrap(), vec!["alpha", "beta", "beta", "finish"]);
    }

    #[tokio::test]
    async fn test_self_loop_interrupts_only_on_first_arrival() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = Workflow::new("looper")
            .add_node(TestNode::looping("looper", log.clone()), Stage::Coding)
            .add_node(TestNode::new("finish", log.clone()), Stage::Done)
            .add_router("looper", |state| {
                if state.iterations < 3 {
                    Next::Node("looper")
                } else {
                    Next::Node("finish")
                }
            })
            .add_router("finish", |_| Next::End)
            .interrupt_before("looper", |s| s.human_in_loop);
        let engine = engine(&dir);

        // halts once, before the first arrival
        let outcome = engine.run(&workflow, state(true)).await.unwrap();
        assert!(matches!(outcome.status, RunStatus::Interrupted { .. }));
        assert!(log.lock().unwrap().is_empty());

        // after resume the self-loop runs to completion without halting again
        let checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();
        let outcome = engine.resume(&workflow, checkpoint, None).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(outcome.state.iterations, 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["looper", "looper", "looper", "finish"]
        );
    }

    #[tokio::test]
    async fn test_serialized_fanout_merges_disjoint_patches() {
        struct ReviewStub {
            name: &'static str,
            role: ReviewRole,
        }

        #[async_trait::async_trait]
        impl WorkflowNode for ReviewStub {
            fn name(&self) -> &'static str {
                self.name
            }

            async fn run(&self, _state: &SessionState) -> Result<StatePatch> {
                Ok(StatePatch::review(
                    self.role,
                    format!("{} notes", self.role.as_str()),
                ))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = Workflow::new("draft")
            .add_node(TestNode::new("draft", log.clone()), Stage::PmDraft)
            .add_node(
                Arc::new(ReviewStub {
                    name: "r1",
                    role: ReviewRole::Pm,
                }),
                Stage::PmReview,
            )
            .add_node(
                Arc::new(ReviewStub {
                    name: "r2",
                    role: ReviewRole::Dev,
                }),
                Stage::PmReview,
            )
            .add_node(
                Arc::new(ReviewStub {
                    name: "r3",
                    role: ReviewRole::Qa,
                }),
                Stage::PmReview,
            )
            .add_node(TestNode::new("join", log.clone()), Stage::PmRevise)
            .add_router("draft", |_| Next::Node("r1"))
            .add_router("r1", |_| Next::Node("r2"))
            .add_router("r2", |_| Next::Node("r3"))
            .add_router("r3", |_| Next::Node("join"))
            .add_router("join", |_| Next::End);

        let outcome = engine(&dir).run(&workflow, state(false)).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(outcome.state.reviews.len(), 3);
        assert_eq!(outcome.state.reviews[&ReviewRole::Dev], "dev notes");
    }

    /// A crash between nodes resumes at the node that had not completed:
    /// the post-node checkpoint records the routed successor.
    #[tokio::test]
    async fn test_checkpoint_points_at_the_next_node() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = linear_workflow(&log);
        let engine = engine(&dir);

        // halt before gamma; the last completed node was beta
        engine.run(&workflow, state(true)).await.unwrap();
        let checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();
        assert_eq!(checkpoint.next_node, "gamma");

        // resuming from that checkpoint does not re-run alpha or beta
        let outcome = engine.resume(&workflow, checkpoint, None).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(
            log.lock().unwrap().iter().filter(|n| *n == "beta").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_node_in_checkpoint_is_a_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let workflow = linear_workflow(&log);
        let engine = engine(&dir);

        engine.run(&workflow, state(true)).await.unwrap();
        let mut checkpoint = CheckpointStore::new(dir.path()).load("wf-test").await.unwrap();
        checkpoint.next_node = "no_such_node".to_string();

        let err = engine.resume(&workflow, checkpoint, None).await.unwrap_err();
        assert_eq!(err.kind(), "state");
    }
}
