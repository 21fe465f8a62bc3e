//! Job domain types

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque identifier of a remote job
///
/// The service may send ids as JSON strings or numbers; both decode to
/// the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(id) => JobId(id),
            Raw::Number(id) => JobId(id.to_string()),
        })
    }
}

/// Remote job record, as returned by `asyncJobs/{id}`
///
/// `detailedProgress.progressNotes` is always present on this path.
/// `statusMessage` is only sent once the job is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default)]
    pub id: Option<JobId>,
    pub status: JobStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
    pub detailed_progress: DetailedProgress,
}

impl Job {
    /// Progress notes in the order the service returned them
    pub fn progress_notes(&self) -> &[ProgressNote] {
        &self.detailed_progress.progress_notes
    }

    /// Final status message; empty until the job is terminal
    pub fn status_message(&self) -> &str {
        self.status_message.as_deref().unwrap_or_default()
    }

    /// Whether the record is terminal but carries no final message
    pub fn is_missing_final_message(&self) -> bool {
        self.status.is_terminal() && self.status_message.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedProgress {
    pub progress_notes: Vec<ProgressNote>,
}

/// One entry of the `asyncJobs` listing
///
/// The listing omits progress details, so only the summary fields are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
}

/// A timestamped, per-step message emitted by a running job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressNote {
    pub timestamp: i64,
    pub step: String,
    pub status: String,
    pub message: String,
}

impl fmt::Display for ProgressNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.step, self.status, self.message)
    }
}

/// Job execution status
///
/// Advances from {Created, Running} to exactly one terminal value and
/// never reverts. Statuses this crate does not know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Created,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Other(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Created | JobStatus::Running)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Created => "Created",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Created" => JobStatus::Created,
            "Running" => JobStatus::Running,
            "Succeeded" => JobStatus::Succeeded,
            "Failed" => JobStatus::Failed,
            "Cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        match value {
            JobStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
