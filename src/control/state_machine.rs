// src/control/state_machine.rs
use std::time::{Duration, Instant};
use tracing::info;

use super::command::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Driving,
    Stopped,
}

impl DriveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveMode::Driving => "DRIVING",
            DriveMode::Stopped => "STOPPED",
        }
    }
}

/// `None` deadlines count as already expired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub mode: DriveMode,
    pub stop_until: Option<Instant>,
    pub cooldown_until: Option<Instant>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            mode: DriveMode::Driving,
            stop_until: None,
            cooldown_until: None,
        }
    }
}

fn expired(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.map_or(true, |d| now > d)
}

pub struct DriveStateMachine {
    state: ControllerState,
    stop_duration: Duration,
    stop_cooldown: Duration,
}

impl DriveStateMachine {
    pub fn new(stop_duration: Duration, stop_cooldown: Duration) -> Self {
        Self {
            state: ControllerState::default(),
            stop_duration,
            stop_cooldown,
        }
    }

    pub fn mode(&self) -> DriveMode {
        self.state.mode
    }

    /// One transition. Returns the command to transmit this tick.
    pub fn step(&mut self, now: Instant, wall_detected: bool, steering: Command) -> Command {
        match self.state.mode {
            DriveMode::Driving => {
                if wall_detected && expired(self.state.cooldown_until, now) {
                    info!(
                        "[control] 🧱 wall detected, stopping for {:?}",
                        self.stop_duration
                    );
                    self.state = ControllerState {
                        mode: DriveMode::Stopped,
                        stop_until: Some(now + self.stop_duration),
                        cooldown_until: Some(now + self.stop_cooldown),
                    };
                    Command::Halt
                } else {
                    steering
                }
            }
            DriveMode::Stopped => {
                if expired(self.state.stop_until, now) {
                    info!("[control] stop elapsed, resuming");
                    self.state.mode = DriveMode::Driving;
                    steering
                } else {
                    Command::Halt
                }
            }
        }
    }
}
