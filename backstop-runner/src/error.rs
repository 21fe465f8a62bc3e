//! Error types for the process runner

use thiserror::Error;

use crate::sink::Stream;

#[derive(Debug, Error)]
pub enum ProcessError {
    /// The command could not be started (missing binary, permissions)
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Reading one of the captured pipes failed
    #[error("Failed to read {stream}: {source}")]
    Read {
        stream: Stream,
        source: std::io::Error,
    },

    /// Checking or collecting the exit status failed
    #[error("Failed to wait for process: {0}")]
    Wait(std::io::Error),
}
