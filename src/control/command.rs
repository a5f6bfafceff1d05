// src/control/command.rs
//
// Motor commands and their line-oriented wire format.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Straight,
    /// Offset magnitude in pixels
    Right(f32),
    Left(f32),
    Halt,
}

impl Command {
    /// Newline-terminated UTF-8 line as sent to the motor controller.
    pub fn to_wire(&self) -> String {
        format!("{}\n", self)
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Command::Halt)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Straight => write!(f, "S"),
            Command::Right(v) => write!(f, "R {:.2}", v),
            Command::Left(v) => write!(f, "L {:.2}", v),
            Command::Halt => write!(f, "H"),
        }
    }
}

/// Turn toward the target once the offset leaves the dead band.
pub fn derive_steering_command(offset: f32, threshold: f32) -> Command {
    if offset.abs() > threshold {
        if offset > 0.0 {
            Command::Right(offset)
        } else {
            Command::Left(offset.abs())
        }
    } else {
        Command::Straight
    }
}
