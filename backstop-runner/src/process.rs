//! Process runner
//!
//! Spawns a command with both output streams piped and multiplexes them
//! into an [`OutputSink`]. The pipes are registered with the tokio reactor
//! in non-blocking mode; each loop iteration checks liveness, then waits
//! (bounded) for either pipe to become readable.
//!
//! End of data is signalled by pipe closure, not by process exit: output
//! still buffered in a pipe when the process exits is drained before the
//! exit code is returned.

use std::process::{ExitStatus, Stdio};

use backstop_core::command::CommandSpec;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

use crate::error::ProcessError;
use crate::lines::LineBuffer;
use crate::sink::{OutputSink, Stream, TracingSink};

/// Upper bound on a single readiness wait
pub const DEFAULT_READY_WAIT: Duration = Duration::from_secs(1);

/// Raw exit code of the command; `128 + signal` when killed by a signal
pub type ExitCode = i32;

const READ_CHUNK: usize = 8192;

/// Runs external commands and streams their output
pub struct ProcessRunner<S: OutputSink = TracingSink> {
    sink: S,
    wait: Duration,
}

impl ProcessRunner<TracingSink> {
    /// Creates a runner that logs through `tracing`
    pub fn new() -> Self {
        Self::with_sink(TracingSink)
    }
}

impl Default for ProcessRunner<TracingSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OutputSink> ProcessRunner<S> {
    pub fn with_sink(sink: S) -> Self {
        Self {
            sink,
            wait: DEFAULT_READY_WAIT,
        }
    }

    /// Overrides the bounded readiness wait
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs `spec` to completion
    ///
    /// # Returns
    /// The command's raw exit code, once the process has exited and both
    /// pipes are closed
    pub async fn run(&self, spec: &CommandSpec) -> Result<ExitCode, ProcessError> {
        debug!("Run {}", spec);

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                error!("Failed to start {}: {}", spec, source);
                ProcessError::Spawn {
                    program: spec.program.clone(),
                    source,
                }
            })?;

        let mut stdout = Pipe::new(Stream::Stdout, child.stdout.take());
        let mut stderr = Pipe::new(Stream::Stderr, child.stderr.take());
        let mut exit: Option<ExitStatus> = None;

        loop {
            if exit.is_none() {
                exit = child.try_wait().map_err(ProcessError::Wait)?;
                if let Some(status) = &exit {
                    debug!("{} exited ({}), draining output", spec.program, status);
                }
            }

            if !stdout.is_open() && !stderr.is_open() {
                break;
            }

            tokio::select! {
                read = stdout.read(), if stdout.is_open() => {
                    stdout.consume(read?, &self.sink);
                }
                read = stderr.read(), if stderr.is_open() => {
                    stderr.consume(read?, &self.sink);
                }
                _ = time::sleep(self.wait) => {}
            }
        }

        // both pipes closed; the process may still be running
        let status = match exit {
            Some(status) => status,
            None => child.wait().await.map_err(ProcessError::Wait)?,
        };

        let code = exit_code(status);
        info!("exit code: {}", code);
        Ok(code)
    }
}

/// One captured pipe and its line assembler
struct Pipe<R> {
    stream: Stream,
    reader: Option<R>,
    buf: Box<[u8]>,
    lines: LineBuffer,
}

impl<R: AsyncRead + Unpin> Pipe<R> {
    fn new(stream: Stream, reader: Option<R>) -> Self {
        Self {
            stream,
            reader,
            buf: vec![0; READ_CHUNK].into_boxed_slice(),
            lines: LineBuffer::new(),
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Reads what the pipe currently holds; `Ok(0)` means closed
    async fn read(&mut self) -> Result<usize, ProcessError> {
        match &mut self.reader {
            Some(reader) => reader
                .read(&mut self.buf)
                .await
                .map_err(|source| ProcessError::Read {
                    stream: self.stream,
                    source,
                }),
            None => std::future::pending().await,
        }
    }

    fn consume<S: OutputSink>(&mut self, n: usize, sink: &S) {
        if n == 0 {
            self.reader = None;
            if let Some(rest) = self.lines.finish() {
                sink.line(self.stream, &rest);
            }
            return;
        }

        for line in self.lines.push(&self.buf[..n]) {
            sink.line(self.stream, &line);
        }
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
