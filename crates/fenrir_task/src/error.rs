use std::process::ExitStatus;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum InvalidTaskError {
    #[error("a task requires a program to run")]
    EmptyProgram,
}

#[derive(Debug, Error, Diagnostic)]
pub enum TaskError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] InvalidTaskError),

    #[error("failed to launch '{program}'")]
    #[diagnostic(help("make sure the executable exists and is marked as executable"))]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' failed with {status}{}", format_stderr(.stderr))]
    Execution {
        program: String,
        status: ExitStatus,
        /// The standard error of the failed command, byte for byte.
        stderr: Vec<u8>,
    },

    #[error("failed to communicate with '{program}'")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    /// The captured standard error of a failed command, if any was captured.
    pub fn stderr(&self) -> Option<&[u8]> {
        match self {
            TaskError::Execution { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

fn format_stderr(stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}
