//! Job-related API endpoints

use crate::TsmClient;
use crate::error::{ClientError, Result};
use backstop_core::domain::job::{Job, JobId, JobSummary};
use backstop_core::dto::job::{AsyncJobEnvelope, AsyncJobsEnvelope, BackupRequest, StartedJob};
use chrono::NaiveDateTime;
use reqwest::Method;
use tracing::{debug, error};

/// Date suffix appended to backup names
const DATE_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Name of the backup file written by the server
///
/// `{base}_{date}` when `add_date` is set, `base` otherwise.
pub fn backup_name(base: &str, add_date: bool, now: NaiveDateTime) -> String {
    if add_date {
        format!("{}_{}", base, now.format(DATE_FORMAT))
    } else {
        base.to_string()
    }
}

impl TsmClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Start a fixed-file backup
    ///
    /// # Returns
    /// The id of the asynchronous job running the backup
    pub async fn start_backup(&self, req: &BackupRequest) -> Result<JobId> {
        let write_path = backup_name(&req.file, req.add_date, chrono::Local::now().naive_local());
        debug!(
            "Start backup file:{}, skip-verification:{}, timeout:{}",
            write_path, req.skip_verification, req.timeout_seconds
        );

        let mut query = vec![
            ("jobTimeoutSeconds", req.timeout_seconds.to_string()),
            ("writePath", write_path),
            ("skipVerification", req.skip_verification.to_string()),
        ];
        if req.override_disk_check {
            query.push(("overrideDiskSpaceCheck", "true".to_string()));
        }

        let request = self
            .request(Method::POST, "backupFixedFile")
            .query(&query);
        let response = self.send(request).await?;

        let envelope: AsyncJobEnvelope<StartedJob> = self.handle_response(response).await?;
        Ok(envelope.async_job.id)
    }

    /// Get a job by ID
    ///
    /// A terminal job without a `statusMessage` is a decode error.
    pub async fn get_job(&self, job_id: &JobId) -> Result<Job> {
        let request = self.request(Method::GET, &format!("asyncJobs/{}", job_id));
        let response = self.send(request).await?;

        let envelope: AsyncJobEnvelope<Job> = self.handle_response(response).await?;
        let job = envelope.async_job;
        if job.is_missing_final_message() {
            error!("Job {} is {} without a statusMessage", job_id, job.status);
            return Err(ClientError::Decode(format!(
                "job {} is {} but has no statusMessage",
                job_id, job.status
            )));
        }
        Ok(job)
    }

    /// List all jobs known to the server
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let response = self.send(self.request(Method::GET, "asyncJobs")).await?;

        let envelope: AsyncJobsEnvelope = self.handle_response(response).await?;
        Ok(envelope.async_jobs)
    }
}
