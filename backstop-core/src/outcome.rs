//! Run outcome policy
//!
//! Every run ends with one integer value: the process exit status of the
//! `backstop` binary and the value sent to monitoring.

use crate::domain::job::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome(i32);

impl Outcome {
    pub const SUCCESS: Outcome = Outcome(0);
    pub const FAILURE: Outcome = Outcome(1);

    /// Outcome of a remote job that reached `status`
    ///
    /// Only `Failed` counts as a failure. Every other terminal status,
    /// `Cancelled` included, is reported as success.
    pub fn from_status(status: &JobStatus) -> Self {
        match status {
            JobStatus::Failed => Self::FAILURE,
            _ => Self::SUCCESS,
        }
    }

    /// Outcome of a local command: its raw exit code
    pub fn from_exit_code(code: i32) -> Self {
        Self(code)
    }

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_is_failure() {
        let outcome = Outcome::from_status(&JobStatus::Failed);
        assert!(!outcome.is_success());
        assert_eq!(outcome.code(), 1);
    }

    #[test]
    fn test_other_terminal_statuses_succeed() {
        assert!(Outcome::from_status(&JobStatus::Succeeded).is_success());
        assert!(Outcome::from_status(&JobStatus::Cancelled).is_success());
        assert!(Outcome::from_status(&JobStatus::Other("Paused".into())).is_success());
    }

    #[test]
    fn test_exit_code_passes_through() {
        assert_eq!(Outcome::from_exit_code(0), Outcome::SUCCESS);
        assert_eq!(Outcome::from_exit_code(3).code(), 3);
    }
}
