//! Statistics aggregation engine.

pub mod aggregate;

pub use aggregate::{compute_metrics, group_by_category, group_by_sport, BetMetrics};
