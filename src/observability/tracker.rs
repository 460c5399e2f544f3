use std::collections::HashMap;

use crate::llm::TokenUsage;

/// Accumulates token usage across a workflow run, keyed by node name,
/// with a running total. The engine owns one per run; it is also usable
/// standalone for cost accounting across runs.
#[derive(Debug, Default)]
pub struct TokenUsageTracker {
    per_node: HashMap<String, TokenUsage>,
    total: Option<TokenUsage>,
}

impl TokenUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage for a node. Repeated records for the same node (e.g.
    /// a conditional's aggregated children) are combined.
    pub fn record(&mut self, node_name: &str, usage: &TokenUsage) {
        self.per_node
            .entry(node_name.to_string())
            .and_modify(|existing| *existing = existing.combine(usage))
            .or_insert_with(|| usage.clone());
        self.total = Some(match &self.total {
            Some(total) => total.combine(usage),
            None => usage.clone(),
        });
    }

    /// Running total across all recorded nodes, if any usage was recorded.
    pub fn total(&self) -> Option<&TokenUsage> {
        self.total.as_ref()
    }

    pub fn node_usage(&self, node_name: &str) -> Option<&TokenUsage> {
        self.per_node.get(node_name)
    }

    pub fn all_node_usage(&self) -> &HashMap<String, TokenUsage> {
        &self.per_node
    }

    pub fn reset(&mut self) {
        self.per_node.clear();
        self.total = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker() {
        let tracker = TokenUsageTracker::new();
        assert!(tracker.total().is_none());
        assert!(tracker.node_usage("any").is_none());
    }

    #[test]
    fn test_record_and_total() {
        let mut tracker = TokenUsageTracker::new();
        tracker.record("a", &TokenUsage::new(10, 5, "m", "mock"));
        tracker.record("b", &TokenUsage::new(2, 3, "m", "mock"));

        let total = tracker.total().unwrap();
        assert_eq!(total.prompt_tokens, 12);
        assert_eq!(total.completion_tokens, 8);
        assert_eq!(total.total_tokens, 20);
        assert_eq!(tracker.node_usage("a").unwrap().total_tokens, 15);
        assert_eq!(tracker.all_node_usage().len(), 2);
    }

    #[test]
    fn test_same_node_combines() {
        let mut tracker = TokenUsageTracker::new();
        tracker.record("a", &TokenUsage::new(1, 1, "m", "mock"));
        tracker.record("a", &TokenUsage::new(2, 2, "m", "mock"));
        assert_eq!(tracker.node_usage("a").unwrap().total_tokens, 6);
        assert_eq!(tracker.total().unwrap().total_tokens, 6);
    }

    #[test]
    fn test_reset() {
        let mut tracker = TokenUsageTracker::new();
        tracker.record("a", &TokenUsage::new(1, 1, "m", "mock"));
        tracker.reset();
        assert!(tracker.total().is_none());
        assert!(tracker.all_node_usage().is_empty());
    }
}
