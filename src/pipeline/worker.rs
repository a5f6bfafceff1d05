// src/pipeline/worker.rs
//
// Generic capture → detect → publish loop. One worker per camera task,
// each on its own blocking thread.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::metrics::{inc, set_timing, WorkerMetrics};
use super::retry::RetryPolicy;
use super::shared_state::SharedPerceptionState;
use crate::capture::FrameSource;
use crate::detection::Detector;
use crate::error::Result;
use crate::types::{Frame, RetryConfig};

pub struct PerceptionWorker<D: Detector> {
    detector: D,
    state: Arc<SharedPerceptionState>,
    interval: Duration,
    idle_sleep: Duration,
    retry: RetryPolicy,
    metrics: WorkerMetrics,
}

impl<D: Detector> PerceptionWorker<D> {
    pub fn new(
        detector: D,
        state: Arc<SharedPerceptionState>,
        target_hz: f64,
        retry: &RetryConfig,
        metrics: WorkerMetrics,
    ) -> Self {
        Self {
            detector,
            state,
            // An unrepresentable period means the detector never runs.
            interval: Duration::try_from_secs_f64(1.0 / target_hz).unwrap_or(Duration::MAX),
            idle_sleep: Duration::from_millis(retry.idle_sleep_ms),
            retry: RetryPolicy::from_config(retry),
            metrics,
        }
    }

    /// Open the source and loop until stop is requested. A source that
    /// cannot be opened stops the whole process.
    pub fn run<F>(mut self, open: F)
    where
        F: FnOnce() -> Result<Box<dyn FrameSource>>,
    {
        let tag = self.detector.name();
        info!("[{}] starting (every {:?})", tag, self.interval);

        let mut source = match open() {
            Ok(source) => source,
            Err(e) => {
                error!("[{}] {}; requesting shutdown", tag, e);
                self.state.request_stop();
                return;
            }
        };
        info!("[{}] ✓ frame source ready", tag);

        let mut last_processed = Instant::now();

        while !self.state.stop_requested() {
            // Read every iteration so stale buffered frames are drained
            let frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.backoff(tag, "no frame available");
                    continue;
                }
                Err(e) => {
                    self.backoff(tag, &e.to_string());
                    continue;
                }
            };
            self.retry.reset();
            inc(&self.metrics.frames_captured);

            let now = Instant::now();
            if now.duration_since(last_processed) >= self.interval {
                last_processed = now;
                self.process(&frame);
            }

            thread::sleep(self.idle_sleep);
        }

        source.release();
        info!("[{}] frame source released", tag);
    }

    fn process(&self, frame: &Frame) {
        let started = Instant::now();
        match self.detector.process(frame) {
            Ok(output) => {
                self.state.publish(output.into());
                inc(&self.metrics.frames_processed);
                set_timing(&self.metrics.last_process_us, started.elapsed().as_micros() as u64);
            }
            Err(e) => {
                inc(&self.metrics.processing_errors);
                warn!("[{}] processing failed, keeping previous estimate: {}", self.detector.name(), e);
            }
        }
    }

    fn backoff(&mut self, tag: &str, reason: &str) {
        inc(&self.metrics.capture_failures);
        let delay = self.retry.next_delay();
        warn!("[{}] frame read failed ({}); retrying in {:?}", tag, reason, delay);
        thread::sleep(delay);
    }
}
