//! Process tasks: one external command with configurable input, output and
//! error streams, optionally chained to follow-on commands.
//!
//! A [`TaskBuilder`] collects the configuration, [`TaskBuilder::build`]
//! validates it into an immutable [`Task`], and [`Task::run`] consumes the task
//! and returns the [`RunOutput`] of the last command in the chain.
#![deny(clippy::dbg_macro)]

mod error;
mod task;

pub use error::{InvalidTaskError, TaskError};
pub use task::{RunOutput, Task, TaskBuilder, TaskInput, TaskOutput};
