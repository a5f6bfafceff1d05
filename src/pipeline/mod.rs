// src/pipeline/mod.rs

pub mod metrics;
pub mod retry;
pub mod shared_state;
pub mod worker;

pub use metrics::{ControlMetrics, MetricsSummary, WorkerMetrics};
pub use shared_state::{PerceptionSnapshot, SharedPerceptionState};
pub use worker::PerceptionWorker;
