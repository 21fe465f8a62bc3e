//! Remote backup command handlers
//!
//! Start, inspect and follow backup jobs through the TSM API.

use anyhow::{Context, Result};
use backstop_client::{JobPoller, ProgressMark, ProgressObserver, TsmClient};
use backstop_core::config::Config;
use backstop_core::domain::job::{Job, JobId, JobStatus, JobSummary, ProgressNote};
use backstop_core::dto::job::BackupRequest;
use backstop_core::outcome::Outcome;
use clap::Args;
use colored::*;
use std::time::Duration;
use tracing::debug;

use super::maintenance::metric_sink;
use crate::monitor::{self, MetricSink};

/// Arguments of `backstop start`
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Name of backup file
    #[arg(long, default_value = "backup")]
    file: String,

    /// Do not append the current date to the backup file name
    #[arg(long)]
    no_date: bool,

    /// Wait for the job to finish
    #[arg(long)]
    wait: bool,

    /// Do not verify integrity of the database backup
    #[arg(long)]
    skip_verification: bool,

    /// Seconds the server lets the job run before cancelling it
    #[arg(long, default_value_t = 1800)]
    timeout: u64,

    /// Start even if the server reports insufficient disk space
    #[arg(long)]
    override_disk_check: bool,

    /// Stop waiting after this many seconds (the job keeps running)
    #[arg(long, value_name = "SECS", requires = "wait")]
    max_wait: Option<u64>,
}

impl From<&BackupArgs> for BackupRequest {
    fn from(args: &BackupArgs) -> Self {
        BackupRequest {
            file: args.file.clone(),
            add_date: !args.no_date,
            skip_verification: args.skip_verification,
            timeout_seconds: args.timeout,
            override_disk_check: args.override_disk_check,
        }
    }
}

/// Start a backup, optionally following it to the end
///
/// With `--wait` the job's outcome goes to monitoring. Monitoring also
/// hears FAILURE whenever starting or following the job errors.
pub async fn start(args: BackupArgs, config: &Config) -> Result<Outcome> {
    let sender = metric_sink(config)?;
    let result = start_job(&args, config).await;

    if args.wait || result.is_err() {
        monitor::report_result(sender.as_ref().map(|s| s as &dyn MetricSink), result).await
    } else {
        result
    }
}

async fn start_job(args: &BackupArgs, config: &Config) -> Result<Outcome> {
    let client = connect(config).await?;
    let request = BackupRequest::from(args);
    debug!("Start backup: {:?}", request);

    let job_id = client
        .start_backup(&request)
        .await
        .context("Failed to start backup")?;
    println!("job id: {}", job_id.to_string().cyan());

    if !args.wait {
        return Ok(Outcome::SUCCESS);
    }
    follow(&client, &job_id, args.max_wait.map(Duration::from_secs)).await
}

/// List all jobs
pub async fn list(config: &Config) -> Result<Outcome> {
    let client = connect(config).await?;
    let jobs = client.list_jobs().await.context("Failed to list jobs")?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(Outcome::SUCCESS)
}

/// Show one job, optionally following it to the end
pub async fn show(id: &str, wait: bool, config: &Config) -> Result<Outcome> {
    let job_id = JobId::new(id);
    reported_if(wait, config, async {
        let client = connect(config).await?;
        inspect(&client, &job_id, wait).await
    })
    .await
}

/// Show the most recently created job
pub async fn latest(wait: bool, config: &Config) -> Result<Outcome> {
    reported_if(wait, config, async {
        let client = connect(config).await?;
        let jobs = client.list_jobs().await.context("Failed to list jobs")?;

        let Some(job) = most_recent(&jobs) else {
            println!("{}", "No jobs found.".yellow());
            return Ok(Outcome::SUCCESS);
        };
        inspect(&client, &job.id, wait).await
    })
    .await
}

/// Runs `run`, forwarding its result to monitoring when `wait` is set
///
/// Following a job to its end is a monitored run; a one-shot look at a
/// job is not.
async fn reported_if(
    wait: bool,
    config: &Config,
    run: impl Future<Output = Result<Outcome>>,
) -> Result<Outcome> {
    if !wait {
        return run.await;
    }
    let sender = metric_sink(config)?;
    monitor::report_result(sender.as_ref().map(|s| s as &dyn MetricSink), run.await).await
}

async fn inspect(client: &TsmClient, job_id: &JobId, wait: bool) -> Result<Outcome> {
    if wait {
        return follow(client, job_id, None).await;
    }

    let job = client
        .get_job(job_id)
        .await
        .with_context(|| format!("Failed to get job {}", job_id))?;
    print_job_details(job_id, &job);

    Ok(if job.status.is_terminal() {
        Outcome::from_status(&job.status)
    } else {
        Outcome::SUCCESS
    })
}

/// Log in with the configured credentials
async fn connect(config: &Config) -> Result<TsmClient> {
    let credentials = config.tsm.credentials()?;
    let client = TsmClient::from_settings(&config.tsm)?;
    client
        .login(&credentials)
        .await
        .context("Failed to log in to TSM")?;
    Ok(client)
}

/// Polls the job to a terminal status, printing progress as it arrives
async fn follow(client: &TsmClient, job_id: &JobId, max_wait: Option<Duration>) -> Result<Outcome> {
    let mut poller = JobPoller::new(client);
    if let Some(max_wait) = max_wait {
        poller = poller.with_deadline(max_wait);
    }

    let mut mark = ProgressMark::new();
    let job = poller
        .poll(job_id, &mut mark, &mut ConsoleObserver)
        .await
        .with_context(|| format!("Failed while waiting for job {}", job_id))?;

    Ok(Outcome::from_status(&job.status))
}

/// Prints progress to the operator's terminal
struct ConsoleObserver;

impl ProgressObserver for ConsoleObserver {
    fn on_note(&mut self, note: &ProgressNote) {
        println!("{}", note);
    }

    fn on_finished(&mut self, job: &Job) {
        println!("{}", "------------------------".dimmed());
        println!("{}: {}", colorize_status(&job.status), job.status_message());
    }
}

/// Job with the highest creation timestamp; the last listed one if none has it
fn most_recent(jobs: &[JobSummary]) -> Option<&JobSummary> {
    jobs.iter()
        .filter(|j| j.creation_timestamp.is_some())
        .max_by_key(|j| j.creation_timestamp)
        .or_else(|| jobs.last())
}

/// Print a job summary line
fn print_job_summary(job: &JobSummary) {
    println!("  {} Job {}", "▸".cyan(), job.id.as_str().dimmed());
    if let Some(job_type) = &job.job_type {
        println!("    Type:     {}", job_type);
    }
    println!("    Status:   {}", colorize_status(&job.status));
    if let Some(created) = job.creation_timestamp.and_then(format_timestamp) {
        println!("    Created:  {}", created.dimmed());
    }
    println!();
}

/// Print detailed job information
fn print_job_details(job_id: &JobId, job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job_id.to_string().cyan());
    if let Some(job_type) = &job.job_type {
        println!("  Type:        {}", job_type);
    }
    println!("  Status:      {}", colorize_status(&job.status));
    if let Some(created) = job.creation_timestamp.and_then(format_timestamp) {
        println!("  Created:     {}", created);
    }
    if !job.status_message().is_empty() {
        println!("  Message:     {}", job.status_message());
    }

    let notes = job.progress_notes();
    if !notes.is_empty() {
        println!("\n{}", "Progress:".bold());
        for note in notes {
            println!("  {}", note);
        }
    }
}

/// Millisecond epoch timestamp in local time
fn format_timestamp(millis: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis).map(|t| {
        t.with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    })
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Created => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Succeeded => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Cancelled => status_str.dimmed(),
        JobStatus::Other(_) => status_str.normal(),
    }
}
