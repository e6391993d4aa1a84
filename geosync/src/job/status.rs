//! Download job status.

use std::fmt;

/// Lifecycle state of a download job.
///
/// `Created → Running → {Succeeded | Failed | Canceled}`, with
/// `Running → Paused → Running` while polling can be suspended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JobStatus {
    /// Constructed but not yet executing.
    #[default]
    Created,

    /// Transfer in progress.
    Running,

    /// Polling suspended; the server-side export keeps its state.
    Paused,

    /// Snapshot materialized at the destination path.
    Succeeded,

    /// Transfer failed; see the job outcome for the error.
    Failed,

    /// Canceled before completion. Not an error.
    Canceled,
}

impl JobStatus {
    /// Returns true for terminal states (Succeeded, Failed, Canceled).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Returns true while the job may still make progress.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Created | Self::Running | Self::Paused)
    }

    /// Returns true if the job is paused.
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Running => write!(f, "Running"),
            Self::Paused => write!(f, "Paused"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Canceled => write!(f, "Canceled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_active_states() {
        assert!(JobStatus::Created.is_active());
        assert!(JobStatus::Running.is_active());
        assert!(JobStatus::Paused.is_active());
        assert!(!JobStatus::Canceled.is_active());
    }

    #[test]
    fn test_default_is_created() {
        assert_eq!(JobStatus::default(), JobStatus::Created);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", JobStatus::Running), "Running");
        assert_eq!(format!("{}", JobStatus::Canceled), "Canceled");
    }
}
