//! Infrastructure

pub mod command;

pub use command::{CapturedRun, CommandError, CommandRunner};
