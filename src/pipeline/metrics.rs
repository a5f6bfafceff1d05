// src/pipeline/metrics.rs
//
// Runtime counters for the workers and the control loop. Logged as JSON
// when the process shuts down.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct WorkerMetrics {
    pub name: &'static str,
    pub frames_captured: Arc<AtomicU64>,
    pub frames_processed: Arc<AtomicU64>,
    pub capture_failures: Arc<AtomicU64>,
    pub processing_errors: Arc<AtomicU64>,
    pub last_process_us: Arc<AtomicU64>,
}

impl WorkerMetrics {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            frames_captured: Arc::new(AtomicU64::new(0)),
            frames_processed: Arc::new(AtomicU64::new(0)),
            capture_failures: Arc::new(AtomicU64::new(0)),
            processing_errors: Arc::new(AtomicU64::new(0)),
            last_process_us: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            name: self.name,
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
            last_process_us: self.last_process_us.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlMetrics {
    pub ticks: Arc<AtomicU64>,
    pub commands_sent: Arc<AtomicU64>,
    pub halts: Arc<AtomicU64>,
    pub write_failures: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ControlMetrics {
    pub fn new() -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(0)),
            commands_sent: Arc::new(AtomicU64::new(0)),
            halts: Arc::new(AtomicU64::new(0)),
            write_failures: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn tick_rate(&self) -> f64 {
        let ticks = self.ticks.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            ticks as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for ControlMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn set_timing(counter: &AtomicU64, duration_us: u64) {
    counter.store(duration_us, Ordering::Relaxed);
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerSummary {
    pub name: &'static str,
    pub frames_captured: u64,
    pub frames_processed: u64,
    pub capture_failures: u64,
    pub processing_errors: u64,
    pub last_process_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub ticks: u64,
    pub tick_rate: f64,
    pub commands_sent: u64,
    pub halts: u64,
    pub write_failures: u64,
    pub elapsed_secs: f64,
    pub workers: Vec<WorkerSummary>,
}

impl MetricsSummary {
    pub fn collect(control: &ControlMetrics, workers: &[WorkerMetrics]) -> Self {
        Self {
            ticks: control.ticks.load(Ordering::Relaxed),
            tick_rate: control.tick_rate(),
            commands_sent: control.commands_sent.load(Ordering::Relaxed),
            halts: control.halts.load(Ordering::Relaxed),
            write_failures: control.write_failures.load(Ordering::Relaxed),
            elapsed_secs: control.started_at.elapsed().as_secs_f64(),
            workers: workers.iter().map(WorkerMetrics::summary).collect(),
        }
    }
}
