//! Observability helpers: token usage aggregation.

mod tracker;

pub use tracker::TokenUsageTracker;
