//! Job DTOs for the TSM job API

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobId, JobSummary};

/// `{ "asyncJob": ... }` wrapper used by single-job responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncJobEnvelope<T> {
    pub async_job: T,
}

/// `{ "asyncJobs": [...] }` wrapper returned by the job listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncJobsEnvelope {
    pub async_jobs: Vec<JobSummary>,
}

/// The part of a freshly started job the client needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedJob {
    pub id: JobId,
}

/// Parameters of a `backupFixedFile` request
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Base name of the backup file
    pub file: String,
    /// Append the current local date and time to `file`
    pub add_date: bool,
    /// Skip the database integrity check after the backup
    pub skip_verification: bool,
    /// Server-side job timeout, in seconds
    pub timeout_seconds: u64,
    /// Start even when the server reports insufficient disk space
    pub override_disk_check: bool,
}

impl Default for BackupRequest {
    fn default() -> Self {
        Self {
            file: "backup".to_string(),
            add_date: true,
            skip_verification: false,
            timeout_seconds: 1800,
            override_disk_check: false,
        }
    }
}
