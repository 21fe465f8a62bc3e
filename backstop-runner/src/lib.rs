//! Backstop Runner
//!
//! Runs a local maintenance command and streams both of its output
//! channels into a log sink, line by line, while tracking liveness.
//!
//! Architecture:
//! - `process`: spawning and the readiness loop over stdout/stderr
//! - `lines`: per-stream carry-over of unterminated line fragments
//! - `sink`: where complete lines are delivered

pub mod error;
pub mod lines;
pub mod process;
pub mod sink;

pub use error::ProcessError;
pub use process::{DEFAULT_READY_WAIT, ExitCode, ProcessRunner};
pub use sink::{OutputSink, Stream, TracingSink};
