// src/control/mod.rs

mod command;
mod control_loop;
mod state_machine;

pub use command::Command;
pub use control_loop::{ControlLoop, WorkerHandle};
