// src/control/control_loop.rs
//
// Consumes the shared perception state at a fixed tick, runs the drive
// state machine and transmits one command per tick. Owns shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::command::{derive_steering_command, Command};
use super::state_machine::DriveStateMachine;
use crate::pipeline::metrics::inc;
use crate::pipeline::{ControlMetrics, MetricsSummary, PerceptionSnapshot, SharedPerceptionState, WorkerMetrics};
use crate::preview::{PreviewSink, GRAVITY_WINDOW, STEERING_WINDOW, WALL_LEFT_WINDOW, WALL_RIGHT_WINDOW};
use crate::serial::CommandLink;
use crate::types::{ControlConfig, SteeringMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Command chosen this tick (transmitted when the link is up)
    Continue(Command),
    /// A worker or the operator asked the process to stop
    Stop,
}

/// A running perception task the loop joins on shutdown.
pub struct WorkerHandle {
    pub name: &'static str,
    pub handle: JoinHandle<()>,
    pub metrics: WorkerMetrics,
}

pub struct ControlLoop {
    config: ControlConfig,
    mode: SteeringMode,
    state: Arc<SharedPerceptionState>,
    machine: DriveStateMachine,
    link: CommandLink,
    preview: Option<Box<dyn PreviewSink>>,
    metrics: ControlMetrics,
}

impl ControlLoop {
    pub fn new(
        config: ControlConfig,
        mode: SteeringMode,
        state: Arc<SharedPerceptionState>,
        link: CommandLink,
        preview: Option<Box<dyn PreviewSink>>,
    ) -> Self {
        let machine = DriveStateMachine::new(
            Duration::from_millis(config.stop_duration_ms),
            Duration::from_millis(config.stop_cooldown_ms),
        );
        Self {
            config,
            mode,
            state,
            machine,
            link,
            preview,
            metrics: ControlMetrics::new(),
        }
    }

    fn active_offset(&self, snap: &PerceptionSnapshot) -> f32 {
        match self.mode {
            SteeringMode::LineDetect => snap.steering.as_ref().map(|s| s.lateral_offset),
            SteeringMode::Gravity => snap.gravity.as_ref().map(|g| g.lateral_offset),
        }
        .unwrap_or(0.0)
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        inc(&self.metrics.ticks);

        let snap = self.state.snapshot();
        if snap.stop_requested {
            return TickOutcome::Stop;
        }

        let wall = snap.wall.as_ref().map_or(false, |w| w.detected);
        let offset = self.active_offset(&snap);
        let steering = derive_steering_command(offset, self.config.steering_threshold);
        let command = self.machine.step(now, wall, steering);

        if command.is_halt() {
            inc(&self.metrics.halts);
        }
        match self.link.send(&command) {
            Ok(true) => inc(&self.metrics.commands_sent),
            Ok(false) => {}
            Err(_) => inc(&self.metrics.write_failures),
        }

        debug!(
            "[control] state={} mode={} wall={} offset={:6.2} command={}",
            self.machine.mode().as_str(),
            self.mode.as_str(),
            wall,
            offset,
            command
        );

        self.render(&snap);
        TickOutcome::Continue(command)
    }

    fn render(&mut self, snap: &PerceptionSnapshot) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        let steering_frame = match self.mode {
            SteeringMode::LineDetect => snap
                .steering
                .as_ref()
                .and_then(|s| s.debug_frame.as_ref())
                .map(|f| (STEERING_WINDOW, f)),
            SteeringMode::Gravity => snap
                .gravity
                .as_ref()
                .and_then(|g| g.debug_frame.as_ref())
                .map(|f| (GRAVITY_WINDOW, f)),
        };
        let wall_frames = snap.wall.as_ref().into_iter().flat_map(|w| {
            [
                w.debug_frame_right.as_ref().map(|f| (WALL_RIGHT_WINDOW, f)),
                w.debug_frame_left.as_ref().map(|f| (WALL_LEFT_WINDOW, f)),
            ]
        });

        for (window, frame) in steering_frame.into_iter().chain(wall_frames.flatten()) {
            if let Err(e) = preview.show(window, frame) {
                warn!("[control] preview '{}' failed: {}", window, e);
            }
        }
    }

    /// Tick until stop is requested, Ctrl+C, or the preview quit key; then
    /// stop and join every worker, send a final straight command and close
    /// the link.
    pub async fn run(mut self, workers: Vec<WorkerHandle>) -> MetricsSummary {
        let period = Duration::from_millis(self.config.tick_interval_ms);
        info!(
            "[control] 🚦 control loop running: mode={} tick={:?} serial={} (Ctrl+C to stop)",
            self.mode.as_str(),
            period,
            if self.link.is_connected() { "connected" } else { "debug" }
        );

        let signal_state = Arc::clone(&self.state);
        let signal_watch = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("[control] Ctrl+C received");
                signal_state.request_stop();
            }
        });

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.tick(Instant::now()) == TickOutcome::Stop {
                info!("[control] stop requested, shutting down");
                break;
            }

            match self.preview.as_mut() {
                Some(preview) => {
                    let quit = preview.wait_quit(period).unwrap_or_else(|e| {
                        warn!("[control] preview key wait failed: {}", e);
                        false
                    });
                    if quit {
                        info!("[control] quit key pressed, shutting down");
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                None => {
                    interval.tick().await;
                }
            }
        }

        self.shutdown(workers, signal_watch).await
    }

    async fn shutdown(mut self, workers: Vec<WorkerHandle>, signal_watch: JoinHandle<()>) -> MetricsSummary {
        self.state.request_stop();
        signal_watch.abort();

        let mut worker_metrics = Vec::with_capacity(workers.len());
        for worker in workers {
            match worker.handle.await {
                Ok(()) => info!("[control] {} worker finished", worker.name),
                Err(e) => error!("[control] {} worker ended abnormally: {}", worker.name, e),
            }
            worker_metrics.push(worker.metrics);
        }

        if let Ok(true) = self.link.send(&Command::Straight) {
            inc(&self.metrics.commands_sent);
        }
        self.link.close();
        if let Some(mut preview) = self.preview.take() {
            preview.close();
        }

        let summary = MetricsSummary::collect(&self.metrics, &worker_metrics);
        match serde_json::to_string(&summary) {
            Ok(json) => info!("📊 Run summary: {}", json),
            Err(e) => warn!("could not serialize run summary: {}", e),
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{GravityEstimate, SteeringEstimate, WallFlag};
    use crate::preview::fake::RecordingPreview;
    use crate::serial::fake::RecordingChannel;
    use crate::types::Frame;
    use parking_lot::Mutex;
    use std::io;
    use tracing_subscriber::EnvFilter;

    /// Log sink shared with the subscriber under test.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn steering(offset: f32, with_frame: bool) -> SteeringEstimate {
        SteeringEstimate {
            lateral_offset: offset,
            vanishing_x: 120.0 + offset,
            frame_width: 240,
            intersections: 3,
            debug_frame: with_frame.then(|| Frame::filled(4, 4, 3, 0)),
        }
    }

    fn gravity(offset: f32) -> GravityEstimate {
        GravityEstimate {
            lateral_offset: offset,
            centroid_x: 120.0 + offset,
            frame_width: 240,
            debug_frame: None,
        }
    }

    fn wall(detected: bool) -> WallFlag {
        WallFlag {
            detected,
            ..WallFlag::default()
        }
    }

    fn control(mode: SteeringMode, chan: &RecordingChannel) -> (ControlLoop, Arc<SharedPerceptionState>) {
        let state = Arc::new(SharedPerceptionState::new());
        let cfg = ControlConfig {
            tick_interval_ms: 5,
            ..ControlConfig::default()
        };
        let link = CommandLink::new(Some(Box::new(chan.clone())));
        (ControlLoop::new(cfg, mode, Arc::clone(&state), link, None), state)
    }

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_empty_state_drives_straight() {
        let chan = RecordingChannel::default();
        let (mut ctl, _state) = control(SteeringMode::LineDetect, &chan);
        assert_eq!(ctl.tick(Instant::now()), TickOutcome::Continue(Command::Straight));
        assert_eq!(*chan.lines.lock(), vec!["S\n"]);
    }

    #[test]
    fn test_line_detect_mode_uses_steering_slot() {
        let chan = RecordingChannel::default();
        let (mut ctl, state) = control(SteeringMode::LineDetect, &chan);
        state.publish(steering(25.0, false).into());
        state.publish(gravity(-80.0).into());
        ctl.tick(Instant::now());
        assert_eq!(*chan.lines.lock(), vec!["R 25.00\n"]);
    }

    #[test]
    fn test_gravity_mode_uses_gravity_slot() {
        let chan = RecordingChannel::default();
        let (mut ctl, state) = control(SteeringMode::Gravity, &chan);
        state.publish(steering(25.0, false).into());
        state.publish(gravity(-30.5).into());
        ctl.tick(Instant::now());
        assert_eq!(*chan.lines.lock(), vec!["L 30.50\n"]);
    }

    #[test]
    fn test_wall_stop_cycle() {
        let chan = RecordingChannel::default();
        let (mut ctl, state) = control(SteeringMode::LineDetect, &chan);
        let t0 = Instant::now();
        state.publish(steering(-5.0, false).into());
        state.publish(wall(true).into());

        assert_eq!(ctl.tick(t0), TickOutcome::Continue(Command::Halt));
        state.publish(wall(false).into());
        assert_eq!(ctl.tick(at(t0, 1500)), TickOutcome::Continue(Command::Halt));
        assert_eq!(ctl.tick(at(t0, 3050)), TickOutcome::Continue(Command::Straight));

        // cooldown: a new wall before t0 + 10 s keeps driving
        state.publish(wall(true).into());
        assert_eq!(ctl.tick(at(t0, 5000)), TickOutcome::Continue(Command::Straight));
        assert_eq!(ctl.tick(at(t0, 10050)), TickOutcome::Continue(Command::Halt));

        assert_eq!(
            *chan.lines.lock(),
            vec!["H\n", "H\n", "S\n", "S\n", "H\n"]
        );
        assert_eq!(MetricsSummary::collect(&ctl.metrics, &[]).halts, 3);
    }

    #[test]
    fn test_stop_request_ends_without_transmitting() {
        let chan = RecordingChannel::default();
        let (mut ctl, state) = control(SteeringMode::LineDetect, &chan);
        state.request_stop();
        assert_eq!(ctl.tick(Instant::now()), TickOutcome::Stop);
        assert!(chan.lines.lock().is_empty());
    }

    #[test]
    fn test_debug_mode_logs_commands_at_info() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("vision_steer=info"))
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let state = Arc::new(SharedPerceptionState::new());
            let mut ctl = ControlLoop::new(
                ControlConfig::default(),
                SteeringMode::LineDetect,
                Arc::clone(&state),
                CommandLink::new(None),
                None,
            );
            state.publish(steering(25.0, false).into());
            let t0 = Instant::now();
            for i in 0..3 {
                assert_eq!(ctl.tick(at(t0, i * 50)), TickOutcome::Continue(Command::Right(25.0)));
            }
        });

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert_eq!(output.matches("(debug mode) R 25.00").count(), 3, "{}", output);
        assert!(output.contains("INFO"));
    }

    #[test]
    fn test_write_failure_degrades_to_logging() {
        let chan = RecordingChannel {
            fail_after: Some(2),
            ..RecordingChannel::default()
        };
        let (mut ctl, _state) = control(SteeringMode::LineDetect, &chan);
        let t0 = Instant::now();
        for i in 0..5 {
            assert_eq!(ctl.tick(at(t0, i * 50)), TickOutcome::Continue(Command::Straight));
        }
        assert_eq!(chan.lines.lock().len(), 2);
        assert!(*chan.closed.lock());
        let summary = MetricsSummary::collect(&ctl.metrics, &[]);
        assert_eq!(summary.commands_sent, 2);
        assert_eq!(summary.write_failures, 1);
    }

    #[test]
    fn test_preview_receives_active_frames() {
        let chan = RecordingChannel::default();
        let preview = RecordingPreview::default();
        let state = Arc::new(SharedPerceptionState::new());
        let link = CommandLink::new(Some(Box::new(chan.clone())));
        let mut ctl = ControlLoop::new(
            ControlConfig::default(),
            SteeringMode::LineDetect,
            Arc::clone(&state),
            link,
            Some(Box::new(preview.clone())),
        );
        state.publish(steering(0.0, true).into());
        state.publish(
            WallFlag {
                detected: false,
                debug_frame_right: Some(Frame::filled(2, 2, 3, 0)),
                debug_frame_left: None,
            }
            .into(),
        );
        ctl.tick(Instant::now());
        assert_eq!(*preview.shown.lock(), vec![STEERING_WINDOW, WALL_RIGHT_WINDOW]);
    }

    #[tokio::test]
    async fn test_run_shuts_down_on_worker_stop() {
        let chan = RecordingChannel::default();
        let (ctl, state) = control(SteeringMode::LineDetect, &chan);
        state.publish(steering(40.0, false).into());

        let worker_state = Arc::clone(&state);
        let handle = tokio::task::spawn_blocking(move || {
            std::thread::sleep(Duration::from_millis(40));
            worker_state.request_stop();
        });
        let workers = vec![WorkerHandle {
            name: "test",
            handle,
            metrics: WorkerMetrics::new("test"),
        }];

        let summary = ctl.run(workers).await;
        let lines = chan.lines.lock().clone();
        assert!(lines.len() >= 2);
        assert!(lines[..lines.len() - 1].iter().all(|l| l == "R 40.00\n"));
        assert_eq!(lines.last().map(String::as_str), Some("S\n"));
        assert!(*chan.closed.lock());
        assert!(summary.ticks >= 1);
        assert_eq!(summary.workers.len(), 1);
    }

    #[tokio::test]
    async fn test_run_quits_on_preview_key() {
        let chan = RecordingChannel::default();
        let preview = RecordingPreview {
            quit_on: Some(3),
            ..RecordingPreview::default()
        };
        let state = Arc::new(SharedPerceptionState::new());
        let link = CommandLink::new(Some(Box::new(chan.clone())));
        let ctl = ControlLoop::new(
            ControlConfig::default(),
            SteeringMode::LineDetect,
            Arc::clone(&state),
            link,
            Some(Box::new(preview.clone())),
        );

        let summary = ctl.run(Vec::new()).await;
        assert_eq!(summary.ticks, 3);
        assert!(state.stop_requested());
        assert!(*preview.closed.lock());
        assert_eq!(chan.lines.lock().len(), 4);
    }
}
