// src/error.rs
//
// Failure taxonomy shared by the workers, the control loop and the
// device adapters. Only DeviceUnavailable at worker startup crosses a
// task boundary (through the stop flag); everything else is logged and
// absorbed where it happens.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SteerError {
    /// Camera or serial port could not be opened
    #[error("device unavailable: {device}: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    /// Transient capture failure; retried with backoff
    #[error("frame read failed: {0}")]
    FrameRead(String),

    /// Per-frame algorithmic failure; previous estimate is kept
    #[error("processing failed: {0}")]
    Processing(String),

    /// Serial write failed; the channel is closed afterwards
    #[error("command channel write failed: {0}")]
    ChannelWrite(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SteerError {
    pub fn device(device: impl Into<String>, reason: impl ToString) -> Self {
        SteerError::DeviceUnavailable {
            device: device.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serialport::Error> for SteerError {
    fn from(err: serialport::Error) -> Self {
        SteerError::ChannelWrite(err.to_string())
    }
}

#[cfg(feature = "camera")]
impl From<opencv::Error> for SteerError {
    fn from(err: opencv::Error) -> Self {
        SteerError::FrameRead(err.message)
    }
}

pub type Result<T> = std::result::Result<T, SteerError>;
