//! Handle to an in-flight download job.
//!
//! The [`JobHandle`] is returned when a download job starts. It is
//! cloneable and safe to poll from any task: status and progress are
//! `watch` channels, control signals are non-blocking, and
//! [`JobHandle::wait`] resolves once the job reaches a terminal state.

use super::error::SyncError;
use super::status::JobStatus;
use crate::store::LocalGeodatabase;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

/// Terminal result of a download job.
///
/// Delivered exactly once per job, no matter how many progress updates
/// preceded it.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// Snapshot downloaded and opened.
    Succeeded(LocalGeodatabase),
    /// Transfer failed.
    Failed(SyncError),
    /// Canceled by the caller before completion.
    Canceled,
}

impl JobOutcome {
    /// The status this outcome corresponds to.
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Succeeded(_) => JobStatus::Succeeded,
            Self::Failed(_) => JobStatus::Failed,
            Self::Canceled => JobStatus::Canceled,
        }
    }

    /// The materialized geodatabase, if the job succeeded.
    pub fn geodatabase(&self) -> Option<&LocalGeodatabase> {
        match self {
            Self::Succeeded(gdb) => Some(gdb),
            _ => None,
        }
    }
}

/// Control signal for a running job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Signal {
    /// Suspend status polling; the server-side export keeps running.
    Pause,
    /// Resume polling.
    Resume,
}

/// Cloneable handle to a download job.
#[derive(Clone)]
pub struct JobHandle {
    destination: PathBuf,
    status_rx: watch::Receiver<JobStatus>,
    progress_rx: watch::Receiver<f32>,
    signal_tx: mpsc::Sender<Signal>,
    cancel: CancellationToken,
    outcome: Arc<Mutex<Option<JobOutcome>>>,
}

impl JobHandle {
    pub(crate) fn new(
        destination: PathBuf,
        status_rx: watch::Receiver<JobStatus>,
        progress_rx: watch::Receiver<f32>,
        signal_tx: mpsc::Sender<Signal>,
        cancel: CancellationToken,
        outcome: Arc<Mutex<Option<JobOutcome>>>,
    ) -> Self {
        Self {
            destination,
            status_rx,
            progress_rx,
            signal_tx,
            cancel,
            outcome,
        }
    }

    /// The file path this job downloads to.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Most recent status, without waiting.
    pub fn status(&self) -> JobStatus {
        *self.status_rx.borrow()
    }

    /// Last observed progress fraction in [0, 1].
    ///
    /// Guaranteed non-decreasing over the life of the job; stale server
    /// values are clamped at the source (last value wins).
    pub fn progress(&self) -> f32 {
        *self.progress_rx.borrow()
    }

    /// Subscribes to progress updates.
    pub fn progress_watch(&self) -> watch::Receiver<f32> {
        self.progress_rx.clone()
    }

    /// Subscribes to status transitions.
    pub fn status_watch(&self) -> watch::Receiver<JobStatus> {
        self.status_rx.clone()
    }

    /// Suspends status polling. Non-blocking; no-op once terminal.
    pub fn pause(&self) {
        let _ = self.signal_tx.try_send(Signal::Pause);
    }

    /// Resumes a paused job. Non-blocking.
    pub fn resume(&self) {
        let _ = self.signal_tx.try_send(Signal::Resume);
    }

    /// Requests cancellation.
    ///
    /// Best-effort and asynchronous: the terminal notification
    /// eventually reports `Canceled`. Calling this after the job has
    /// already finished is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the job to finish and returns its outcome.
    ///
    /// Resolves once the job reaches a terminal state. Safe to call on
    /// multiple clones; each receives the same outcome.
    pub async fn wait(&mut self) -> JobOutcome {
        while !self.status().is_terminal() {
            if self.status_rx.changed().await.is_err() {
                break;
            }
        }
        self.outcome.lock().await.clone().unwrap_or_else(|| {
            JobOutcome::Failed(SyncError::Internal(
                "job ended without reporting an outcome".to_string(),
            ))
        })
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("destination", &self.destination)
            .field("status", &self.status())
            .field("progress", &self.progress())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handle() -> (
        JobHandle,
        watch::Sender<JobStatus>,
        watch::Sender<f32>,
        mpsc::Receiver<Signal>,
        CancellationToken,
        Arc<Mutex<Option<JobOutcome>>>,
    ) {
        let (status_tx, status_rx) = watch::channel(JobStatus::Created);
        let (progress_tx, progress_rx) = watch::channel(0.0f32);
        let (signal_tx, signal_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let outcome = Arc::new(Mutex::new(None));
        let handle = JobHandle::new(
            PathBuf::from("/scratch/x.geodatabase"),
            status_rx,
            progress_rx,
            signal_tx,
            cancel.clone(),
            outcome.clone(),
        );
        (handle, status_tx, progress_tx, signal_rx, cancel, outcome)
    }

    #[tokio::test]
    async fn test_status_tracks_sender() {
        let (handle, status_tx, ..) = test_handle();
        assert_eq!(handle.status(), JobStatus::Created);

        status_tx.send(JobStatus::Running).unwrap();
        assert_eq!(handle.status(), JobStatus::Running);
    }

    #[tokio::test]
    async fn test_signals_delivered() {
        let (handle, _status_tx, _progress_tx, mut signal_rx, ..) = test_handle();

        handle.pause();
        assert_eq!(signal_rx.recv().await, Some(Signal::Pause));
        handle.resume();
        assert_eq!(signal_rx.recv().await, Some(Signal::Resume));
    }

    #[tokio::test]
    async fn test_cancel_trips_token() {
        let (handle, _s, _p, _r, cancel, _o) = test_handle();
        assert!(!cancel.is_cancelled());
        handle.cancel();
        assert!(cancel.is_cancelled());
        // Idempotent.
        handle.cancel();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_returns_outcome_after_terminal() {
        let (mut handle, status_tx, _p, _r, _c, outcome) = test_handle();

        *outcome.lock().await = Some(JobOutcome::Canceled);
        status_tx.send(JobStatus::Canceled).unwrap();

        let result = handle.wait().await;
        assert!(matches!(result, JobOutcome::Canceled));
    }

    #[tokio::test]
    async fn test_wait_on_clone_sees_same_outcome() {
        let (mut handle, status_tx, _p, _r, _c, outcome) = test_handle();
        let mut clone = handle.clone();

        *outcome.lock().await = Some(JobOutcome::Failed(SyncError::Network("x".to_string())));
        status_tx.send(JobStatus::Failed).unwrap();

        assert!(matches!(handle.wait().await, JobOutcome::Failed(_)));
        assert!(matches!(clone.wait().await, JobOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_missing_outcome_is_internal_error() {
        let (mut handle, status_tx, ..) = test_handle();
        status_tx.send(JobStatus::Failed).unwrap();

        match handle.wait().await {
            JobOutcome::Failed(SyncError::Internal(_)) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_outcome_status_mapping() {
        assert_eq!(JobOutcome::Canceled.status(), JobStatus::Canceled);
        assert_eq!(
            JobOutcome::Failed(SyncError::Network("x".to_string())).status(),
            JobStatus::Failed
        );
    }
}
