//! Output sinks
//!
//! A sink receives whole lines only, tagged with the stream they came
//! from, so lines of the two streams never interleave mid-line.

use std::fmt;
use tracing::{error, info};

/// Which captured pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Destination for the lines of a running command
pub trait OutputSink: Send + Sync {
    fn line(&self, stream: Stream, line: &str);
}

/// Logs stdout lines at info and stderr lines at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, stream: Stream, line: &str) {
        match stream {
            Stream::Stdout => info!(target: "backstop::process", "{}", line),
            Stream::Stderr => error!(target: "backstop::process", "{}", line),
        }
    }
}
