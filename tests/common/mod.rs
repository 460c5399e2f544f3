#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use genai_workflow::{DataMap, NodeContext, NodeResult, TransformNode, WorkflowNode};
use serde_json::Value;

/// Install a tracing subscriber once per test binary so engine events show
/// up in test output. Filter with `RUST_LOG`, e.g. `RUST_LOG=debug`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn data(pairs: &[(&str, Value)]) -> DataMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A transform node emitting a single fixed key/value pair.
pub fn emit(name: &str, key: &str, value: Value) -> Arc<dyn WorkflowNode> {
    let key = key.to_string();
    Arc::new(
        TransformNode::new(name, move |_| Ok([(key.clone(), value.clone())].into())).unwrap(),
    )
}

/// A transform node that always fails with "boom".
pub fn failing(name: &str, critical: bool) -> Arc<dyn WorkflowNode> {
    let node = TransformNode::new(name, |_| Err("boom".into())).unwrap();
    Arc::new(if critical { node } else { node.non_critical() })
}

/// A node that sleeps before completing with no output.
pub struct SleepNode {
    pub name: String,
    pub duration: Duration,
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
