//! The download job runner.
//!
//! A download job drives one snapshot transfer end to end: submit the
//! export request, poll server-side generation status, stream the
//! finished snapshot to its destination path, and open it as a
//! [`LocalGeodatabase`]. The job runs on the Tokio runtime and is
//! controlled through its [`JobHandle`]: pause/resume suspend polling,
//! cancellation is propagated via a `CancellationToken`, and the
//! terminal outcome is published exactly once.

use super::error::SyncError;
use super::handle::{JobHandle, JobOutcome, Signal};
use super::status::JobStatus;
use crate::config::SyncConfig;
use crate::service::{AsyncHttpClient, ExportState, FeatureServiceClient, SnapshotParameters};
use crate::store::LocalGeodatabase;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Share of the progress range covered by server-side generation.
/// The remainder is the result download and local open.
const GENERATION_PROGRESS_SHARE: f32 = 0.95;

/// One snapshot download.
///
/// The job object assumes exclusivity: enforcing the single-active-job
/// policy is the orchestrator's responsibility, not this type's.
pub struct DownloadJob;

impl DownloadJob {
    /// Starts the transfer and returns a handle to it.
    ///
    /// The transfer runs as a spawned task; dropping the handle does
    /// not stop it. `destination` must lie inside the session's
    /// scratch directory (the orchestrator checks this before calling).
    pub fn start<C>(
        client: FeatureServiceClient<C>,
        params: SnapshotParameters,
        destination: PathBuf,
        config: SyncConfig,
    ) -> JobHandle
    where
        C: AsyncHttpClient + Clone + 'static,
    {
        let (status_tx, status_rx) = watch::channel(JobStatus::Created);
        let (progress_tx, progress_rx) = watch::channel(0.0f32);
        let (signal_tx, signal_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let outcome: Arc<Mutex<Option<JobOutcome>>> = Arc::new(Mutex::new(None));

        let handle = JobHandle::new(
            destination.clone(),
            status_rx,
            progress_rx,
            signal_tx.clone(),
            cancel.clone(),
            outcome.clone(),
        );

        tokio::spawn(async move {
            // Keeps signal_rx from closing when all handles are dropped.
            let _signal_keepalive = signal_tx;

            let mut runner = Runner {
                client,
                destination,
                config,
                status_tx,
                progress_tx,
                signal_rx,
                cancel,
            };

            let _ = runner.status_tx.send(JobStatus::Running);
            let result = runner.run(params).await;

            match &result {
                JobOutcome::Succeeded(gdb) => {
                    info!(path = %gdb.path().display(), "download job succeeded");
                }
                JobOutcome::Failed(e) => {
                    error!(error = %e, "download job failed");
                }
                JobOutcome::Canceled => {
                    info!("download job canceled");
                }
            }

            // Publish the outcome before the terminal status so waiters
            // observing the status flip always find it set.
            let terminal = result.status();
            *outcome.lock().await = Some(result);
            let _ = runner.status_tx.send(terminal);
        });

        handle
    }
}

struct Runner<C> {
    client: FeatureServiceClient<C>,
    destination: PathBuf,
    config: SyncConfig,
    status_tx: watch::Sender<JobStatus>,
    progress_tx: watch::Sender<f32>,
    signal_rx: mpsc::Receiver<Signal>,
    cancel: CancellationToken,
}

impl<C: AsyncHttpClient + Clone> Runner<C> {
    async fn run(&mut self, params: SnapshotParameters) -> JobOutcome {
        let deadline = Instant::now() + self.config.job_timeout();

        let export_id = tokio::select! {
            _ = self.cancel.cancelled() => return JobOutcome::Canceled,
            result = self.client.begin_generate(&params) => match result {
                Ok(id) => id,
                Err(e) => return JobOutcome::Failed(e.into()),
            },
        };

        // Generation phase: poll until the server reports completion.
        loop {
            if self.cancel.is_cancelled() {
                return JobOutcome::Canceled;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                warn!(job_id = %export_id, "job deadline exceeded during generation");
                return JobOutcome::Failed(SyncError::Timeout(self.config.job_timeout()));
            };

            let status = tokio::select! {
                _ = self.cancel.cancelled() => return JobOutcome::Canceled,
                _ = tokio::time::sleep(remaining) => {
                    return JobOutcome::Failed(SyncError::Timeout(self.config.job_timeout()));
                }
                result = self.client.export_status(&export_id) => match result {
                    Ok(status) => status,
                    Err(e) => return JobOutcome::Failed(e.into()),
                },
            };

            self.advance_progress(status.progress.clamp(0.0, 1.0) * GENERATION_PROGRESS_SHARE);

            match status.state {
                ExportState::Succeeded => break,
                ExportState::Failed => {
                    let reason = status
                        .error
                        .unwrap_or_else(|| "generation failed without detail".to_string());
                    return JobOutcome::Failed(SyncError::Server(reason));
                }
                ExportState::Running => {
                    debug!(job_id = %export_id, progress = status.progress, "export running");
                    if let Some(outcome) = self.idle(deadline).await {
                        return outcome;
                    }
                }
            }
        }

        // Download phase: fetch the snapshot and land it on disk.
        let bytes = tokio::select! {
            _ = self.cancel.cancelled() => return JobOutcome::Canceled,
            result = self.client.fetch_result(&export_id) => match result {
                Ok(bytes) => bytes,
                Err(e) => return JobOutcome::Failed(e.into()),
            },
        };

        if let Err(e) = tokio::fs::write(&self.destination, &bytes).await {
            return JobOutcome::Failed(SyncError::Disk(e.to_string()));
        }

        match LocalGeodatabase::load(&self.destination).await {
            Ok(gdb) => {
                self.advance_progress(1.0);
                JobOutcome::Succeeded(gdb)
            }
            // The file we just wrote is unusable: the server produced a
            // snapshot this client cannot open.
            Err(e) => JobOutcome::Failed(SyncError::Server(format!(
                "downloaded snapshot unusable: {e}"
            ))),
        }
    }

    /// Sleeps one poll interval, handling pause/resume and cancellation.
    ///
    /// Returns `Some(outcome)` when the job must stop.
    async fn idle(&mut self, deadline: Instant) -> Option<JobOutcome> {
        tokio::select! {
            _ = self.cancel.cancelled() => return Some(JobOutcome::Canceled),
            _ = tokio::time::sleep(self.config.poll_interval()) => return None,
            signal = self.signal_rx.recv() => {
                if signal != Some(Signal::Pause) {
                    return None;
                }
            }
        }

        // Paused: stop polling until resumed or canceled. The overall
        // deadline keeps running; a paused job can still time out.
        let _ = self.status_tx.send(JobStatus::Paused);
        info!("download job paused");

        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Some(JobOutcome::Failed(SyncError::Timeout(
                    self.config.job_timeout(),
                )));
            };
            tokio::select! {
                _ = self.cancel.cancelled() => return Some(JobOutcome::Canceled),
                _ = tokio::time::sleep(remaining) => {
                    return Some(JobOutcome::Failed(SyncError::Timeout(
                        self.config.job_timeout(),
                    )));
                }
                signal = self.signal_rx.recv() => {
                    if signal == Some(Signal::Resume) {
                        let _ = self.status_tx.send(JobStatus::Running);
                        info!("download job resumed");
                        return None;
                    }
                }
            }
        }
    }

    /// Publishes a progress value, clamped monotonically non-decreasing.
    ///
    /// Out-of-order or stale server values never move progress
    /// backwards: last (highest) value wins.
    fn advance_progress(&self, fraction: f32) {
        let current = *self.progress_tx.borrow();
        if fraction > current {
            let _ = self.progress_tx.send(fraction);
        }
    }
}
