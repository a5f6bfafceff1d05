// src/serial.rs
//
// Outbound command transport. A `CommandLink` wraps an optional channel:
// without one (port missing, disabled, or failed mid-run) commands are
// only logged.

use std::io::Write;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::control::Command;
use crate::error::{Result, SteerError};
use crate::types::SerialConfig;

pub trait CommandChannel: Send {
    fn write_line(&mut self, line: &str) -> Result<()>;
    fn close(&mut self);
}

pub struct SerialChannel {
    name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialChannel {
    pub fn open(cfg: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&cfg.port, cfg.baud_rate)
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .open()
            .map_err(|e| SteerError::device(&cfg.port, e))?;
        info!("✓ Serial port {} opened at {} baud", cfg.port, cfg.baud_rate);
        Ok(Self {
            name: cfg.port.clone(),
            port: Some(port),
        })
    }
}

impl CommandChannel for SerialChannel {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| SteerError::ChannelWrite(format!("{} is closed", self.name)))?;
        port.write_all(line.as_bytes())
            .and_then(|_| port.flush())
            .map_err(|e| SteerError::ChannelWrite(format!("{}: {}", self.name, e)))
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Serial port {} closed", self.name);
        }
    }
}

pub struct CommandLink {
    channel: Option<Box<dyn CommandChannel>>,
}

impl CommandLink {
    pub fn new(channel: Option<Box<dyn CommandChannel>>) -> Self {
        Self { channel }
    }

    /// Open the configured port, degrading to debug mode when unavailable.
    pub fn open(cfg: &SerialConfig) -> Self {
        if !cfg.enabled {
            info!("Serial disabled; commands are logged only (debug mode)");
            return Self::new(None);
        }
        match SerialChannel::open(cfg) {
            Ok(ch) => Self::new(Some(Box::new(ch))),
            Err(e) => {
                warn!("{}; continuing without serial (debug mode)", e);
                Self::new(None)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Transmit one command. `Ok(false)` in debug mode. A write failure
    /// closes the channel for the rest of the run.
    pub fn send(&mut self, command: &Command) -> Result<bool> {
        let Some(channel) = self.channel.as_mut() else {
            info!("[control] (debug mode) {}", command);
            return Ok(false);
        };
        match channel.write_line(&command.to_wire()) {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("[control] serial write failed, closing channel: {}", e);
                channel.close();
                self.channel = None;
                Err(e)
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::RecordingChannel;
    use super::*;

    #[test]
    fn test_debug_mode_does_not_transmit() {
        let mut link = CommandLink::new(None);
        assert!(!link.is_connected());
        assert!(!link.send(&Command::Straight).unwrap());
    }

    #[test]
    fn test_sends_wire_lines() {
        let chan = RecordingChannel::default();
        let mut link = CommandLink::new(Some(Box::new(chan.clone())));
        assert!(link.send(&Command::Right(25.0)).unwrap());
        assert!(link.send(&Command::Halt).unwrap());
        assert_eq!(*chan.lines.lock(), vec!["R 25.00\n", "H\n"]);
    }

    #[test]
    fn test_write_failure_closes_channel() {
        let chan = RecordingChannel {
            fail_after: Some(1),
            ..RecordingChannel::default()
        };
        let mut link = CommandLink::new(Some(Box::new(chan.clone())));
        assert!(link.send(&Command::Straight).unwrap());
        assert!(link.send(&Command::Straight).is_err());
        assert!(!link.is_connected());
        assert!(*chan.closed.lock());
        // later ticks skip transmission
        assert!(!link.send(&Command::Halt).unwrap());
        assert_eq!(chan.lines.lock().len(), 1);
    }

    #[test]
    fn test_disabled_serial_is_debug_mode() {
        let cfg = SerialConfig {
            enabled: false,
            ..SerialConfig::default()
        };
        assert!(!CommandLink::open(&cfg).is_connected());
    }

    #[test]
    fn test_missing_port_degrades() {
        let cfg = SerialConfig {
            port: "/dev/nonexistent-vision-steer".into(),
            ..SerialConfig::default()
        };
        assert!(!CommandLink::open(&cfg).is_connected());
    }
}
