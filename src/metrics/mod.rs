// src/metrics/mod.rs
mod collector;

pub use collector::{method_label, MetricsCollector, MetricsRegistry};
