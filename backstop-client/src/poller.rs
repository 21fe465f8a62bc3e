//! Job poller
//!
//! Follows one remote job until its status leaves {Created, Running}.
//! Each tick fetches the whole job, forwards progress notes newer than the
//! caller's [`ProgressMark`], then sleeps for a fixed interval.
//!
//! The mark belongs to the caller. Passing the same mark to a second
//! `poll` of the same job keeps already reported notes from being
//! reported again.

use async_trait::async_trait;
use backstop_core::domain::job::{Job, JobId, ProgressNote};
use thiserror::Error;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info};

use crate::TsmClient;
use crate::error::ClientError;

/// Default pause between two fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PollError {
    /// Fetching the job failed; the loop is not resumed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The optional client-side deadline elapsed before a terminal status
    #[error("Job {job_id} still running after {waited:?}")]
    DeadlineExceeded { job_id: JobId, waited: Duration },
}

/// Anything that can fetch the current state of a job
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn get_job(&self, job_id: &JobId) -> crate::Result<Job>;
}

#[async_trait]
impl JobSource for TsmClient {
    async fn get_job(&self, job_id: &JobId) -> crate::Result<Job> {
        TsmClient::get_job(self, job_id).await
    }
}

/// Receives what the poller reports to the operator
pub trait ProgressObserver {
    /// A progress note not seen before
    fn on_note(&mut self, note: &ProgressNote);

    /// The job reached a terminal status
    fn on_finished(&mut self, job: &Job);
}

/// Highest progress-note timestamp already reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressMark(Option<i64>);

impl ProgressMark {
    /// A mark below every real timestamp
    pub fn new() -> Self {
        Self(None)
    }

    pub fn last_seen(&self) -> Option<i64> {
        self.0
    }

    /// Moves the mark to `timestamp` if it is newer; returns whether it moved
    fn advance(&mut self, timestamp: i64) -> bool {
        match self.0 {
            Some(mark) if timestamp <= mark => false,
            _ => {
                self.0 = Some(timestamp);
                true
            }
        }
    }
}

/// Polls a [`JobSource`] until a job finishes
pub struct JobPoller<'a, S: JobSource + ?Sized> {
    source: &'a S,
    interval: Duration,
    deadline: Option<Duration>,
}

impl<'a, S: JobSource + ?Sized> JobPoller<'a, S> {
    /// Creates a poller with the default interval and no deadline
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Gives up once `deadline` has passed without a terminal status
    ///
    /// Without it the poller waits as long as the job runs; the server's
    /// own job timeout is then the only bound.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Polls `job_id` until it reaches a terminal status
    ///
    /// # Returns
    /// The job as last fetched, in its terminal status
    pub async fn poll<O>(
        &self,
        job_id: &JobId,
        mark: &mut ProgressMark,
        observer: &mut O,
    ) -> Result<Job, PollError>
    where
        O: ProgressObserver + Send + ?Sized,
    {
        let started = Instant::now();
        let mut ticks: u64 = 0;

        loop {
            ticks += 1;
            let job = self.source.get_job(job_id).await?;
            debug!(job_id = %job_id, status = %job.status, tick = ticks, "Fetched job");

            for note in job.progress_notes() {
                if mark.advance(note.timestamp) {
                    observer.on_note(note);
                }
            }

            if job.status.is_terminal() {
                info!(
                    "Job {} finished with status {} after {} fetch(es)",
                    job_id, job.status, ticks
                );
                observer.on_finished(&job);
                return Ok(job);
            }

            if let Some(deadline) = self.deadline {
                let waited = started.elapsed();
                if waited >= deadline {
                    return Err(PollError::DeadlineExceeded {
                        job_id: job_id.clone(),
                        waited,
                    });
                }
            }

            time::sleep(self.interval).await;
        }
    }
}
