//! Blocking entry point for synchronous callers.
//!
//! `run_blocking` bridges into async execution from plain threads and
//! from inside an existing Tokio runtime (where `block_on` would panic).
//! The run is moved onto a dedicated worker thread with its own
//! current-thread runtime; the caller blocks on a channel for the first
//! outcome.
//!
//! With a deadline, the caller gets a TIMEOUT result as soon as it
//! elapses. The in-flight run is not cancelled: it continues on the
//! worker thread so end-of-run hooks still fire, and its eventual result
//! is discarded.

use std::sync::mpsc;
use std::time::Duration;

use uuid::Uuid;

use crate::workflow::{DataMap, Workflow, WorkflowResult};

use super::WorkflowEngine;

impl WorkflowEngine {
    /// Execute `workflow` synchronously, blocking the calling thread.
    ///
    /// `timeout` falls back to the framework's `default_timeout`; `None`
    /// for both means the call blocks until the run finishes. Safe to call
    /// from within an async runtime, though doing so blocks an executor
    /// thread.
    pub fn run_blocking(
        &self,
        workflow: &Workflow,
        input_data: DataMap,
        timeout: Option<Duration>,
        correlation_id: Option<String>,
    ) -> WorkflowResult {
        let timeout = timeout.or(self.config().default_timeout);
        let correlation_id = correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let engine = self.clone();
        let workflow = workflow.clone();
        let workflow_id = workflow.workflow_id().to_string();

        let inside_runtime = tokio::runtime::Handle::try_current().is_ok();
        if !inside_runtime && timeout.is_none() {
            // Plain thread, no deadline: a runtime here is enough.
            return match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(engine.run(
                    &workflow,
                    input_data,
                    Some(correlation_id),
                )),
                Err(err) => runtime_failure(&workflow_id, &correlation_id, &err),
            };
        }

        let (tx, rx) = mpsc::channel();
        let cid = correlation_id.clone();
        let wf_id = workflow_id.clone();
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = tx.send(runtime_failure(&wf_id, &cid, &err));
                    return;
                }
            };
            runtime.block_on(async {
                let fut = engine.run(&workflow, input_data, Some(cid.clone()));
                match timeout {
                    Some(deadline) => {
                        tokio::pin!(fut);
                        tokio::select! {
                            result = &mut fut => {
                                let _ = tx.send(result);
                            }
                            _ = tokio::time::sleep(deadline) => {
                                tracing::warn!(
                                    workflow_id = %wf_id,
                                    correlation_id = %cid,
                                    timeout_secs = deadline.as_secs_f64(),
                                    "blocking run deadline elapsed; abandoning in-flight run"
                                );
                                let _ = tx.send(WorkflowResult::timed_out(
                                    &wf_id,
                                    &cid,
                                    deadline.as_secs_f64(),
                                ));
                                // Let the abandoned run finish so its
                                // end-of-run hooks still fire.
                                let _ = fut.await;
                            }
                        }
                    }
                    None => {
                        let _ = tx.send(fut.await);
                    }
                }
            });
        });

        rx.recv().unwrap_or_else(|_| {
            WorkflowResult::failure(
                &workflow_id,
                &correlation_id,
                crate::error::WorkflowError::InternalError(
                    "worker thread terminated before producing a result".into(),
                )
                .to_string(),
                Default::default(),
                chrono::Utc::now(),
            )
        })
    }
}

fn runtime_failure(
    workflow_id: &str,
    correlation_id: &str,
    err: &std::io::Error,
) -> WorkflowResult {
    WorkflowResult::failure(
        workflow_id,
        correlation_id,
        crate::error::WorkflowError::InternalError(format!("failed to build runtime: {err}"))
            .to_string(),
        Default::default(),
        chrono::Utc::now(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{TransformNode, WorkflowNode};
    use crate::workflow::{NodeContext, NodeResult, WorkflowStatus};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Instant;

    struct SleepNode {
        name: String,
        duration: Duration,
    }

    #[async_trait]
    impl WorkflowNode for SleepNode {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self, context: &NodeContext) -> NodeResult {
            tokio::time::sleep(self.duration).await;
            NodeResult::completed(&context.step_id, DataMap::new(), 0.0)
        }
    }

    fn quick_workflow() -> Workflow {
        let node = TransformNode::new("emit", |_| {
            Ok([("k".to_string(), json!(1))].into())
        })
        .unwrap();
        Workflow::new(vec![Arc::new(node)]).unwrap()
    }

    fn slow_workflow(duration: Duration) -> Workflow {
        Workflow::new(vec![Arc::new(SleepNode {
            name: "slow".into(),
            duration,
        })])
        .unwrap()
    }

    #[test]
    fn test_run_blocking_from_plain_thread() {
        let result = quick_workflow().run_blocking(DataMap::new(), None, None);
        assert_eq!(result.status, WorkflowStatus::Completed);
        assert_eq!(result.output.unwrap()["k"], json!(1));
    }

    #[test]
    fn test_run_blocking_with_generous_deadline_completes() {
        let result =
            quick_workflow().run_blocking(DataMap::new(), Some(Duration::from_secs(30)), None);
        assert_eq!(result.status, WorkflowStatus::Completed);
    }

    #[test]
    fn test_deadline_elapsed_returns_timeout_promptly() {
        let start = Instant::now();
        let result = slow_workflow(Duration::from_secs(5)).run_blocking(
            DataMap::new(),
            Some(Duration::from_millis(100)),
            None,
        );
        assert_eq!(result.status, WorkflowStatus::Timeout);
        assert!(result.error.unwrap().contains("timed out"));
        // returned at the deadline, not after the 5s node
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_run_blocking_inside_runtime_does_not_panic() {
        // Blocks one executor thread but must not panic or deadlock.
        let result = tokio::task::spawn_blocking(|| {
            quick_workflow().run_blocking(DataMap::new(), None, None)
        })
        .await
        .unwrap();
        assert_eq!(result.status, WorkflowStatus::Completed);
    }

    #[test]
    fn test_correlation_id_propagates_to_timeout_result() {
        let result = slow_workflow(Duration::from_secs(5)).run_blocking(
            DataMap::new(),
            Some(Duration::from_millis(50)),
            None,
        );
        assert!(!result.correlation_id.is_empty());
    }
}
