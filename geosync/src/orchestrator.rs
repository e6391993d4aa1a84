//! Sync session orchestrator.
//!
//! One [`SyncOrchestrator`] drives the whole offline-sync flow for one
//! session: stage the online layers, capture the viewport extent,
//! negotiate snapshot parameters, run the download job, and stage the
//! offline layers once the snapshot lands. The orchestrator is a plain
//! value owned by its session; there is no global instance.
//!
//! At most one download job is active per orchestrator. The job type
//! itself does not enforce this; the orchestrator guards job creation
//! with a check-and-set on its active slot, so concurrent `start_sync`
//! attempts race safely and exactly one wins.

use crate::config::SyncConfig;
use crate::job::{DownloadJob, JobHandle, JobOutcome, JobStatus};
use crate::map::{FeatureLayer, MapSurface};
use crate::scratch::ScratchDirectory;
use crate::service::{
    AsyncHttpClient, FeatureServiceClient, FeatureServiceDescriptor, NegotiationError,
};
use crate::store::{LayerOrder, LocalGeodatabase};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, error, info, warn};

/// A sync attempt could not start.
#[derive(Debug, thiserror::Error)]
pub enum SyncStartError {
    /// The map viewport has no established extent to snapshot.
    #[error("map viewport extent not established")]
    ExtentUnavailable,

    /// Another download job is already in flight.
    #[error("a sync job is already active")]
    JobAlreadyActive,

    /// Parameter negotiation with the service failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

/// Observer for sync lifecycle events.
///
/// Held by the orchestrator as a `Weak` reference: the orchestrator and
/// its job tasks never keep the listener alive, and events arriving
/// after the listener is dropped are silently discarded. Callbacks are
/// invoked from the watcher task, so implementations must be `Send`
/// and `Sync` and should not block.
pub trait SyncListener: Send + Sync {
    /// Progress update in [0, 1]; non-decreasing per job.
    fn on_progress(&self, _fraction: f32) {}

    /// Job status transition.
    fn on_status(&self, _status: JobStatus) {}

    /// Terminal notification; fires exactly once per job.
    fn on_sync_complete(&self, _outcome: &JobOutcome) {}
}

/// State of the single active-job slot.
enum ActiveSlot {
    Idle,
    /// Reserved between the check-and-set and the job actually starting
    /// (parameter negotiation is in flight).
    Starting,
    Running(JobHandle),
}

impl ActiveSlot {
    fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Orchestrates one session's offline sync.
pub struct SyncOrchestrator<C> {
    client: FeatureServiceClient<C>,
    scratch: ScratchDirectory,
    config: SyncConfig,
    descriptor: Option<FeatureServiceDescriptor>,
    active: Arc<Mutex<ActiveSlot>>,
    listener: Option<Weak<dyn SyncListener>>,
}

impl<C> SyncOrchestrator<C>
where
    C: AsyncHttpClient + Clone + 'static,
{
    /// Creates an orchestrator over a prepared scratch directory.
    pub fn new(client: FeatureServiceClient<C>, scratch: ScratchDirectory, config: SyncConfig) -> Self {
        Self {
            client,
            scratch,
            config,
            descriptor: None,
            active: Arc::new(Mutex::new(ActiveSlot::Idle)),
            listener: None,
        }
    }

    /// Registers the lifecycle listener.
    ///
    /// Only a weak reference is kept; callers retain ownership and may
    /// drop the listener at any time.
    pub fn set_listener(&mut self, listener: Weak<dyn SyncListener>) {
        self.listener = Some(listener);
    }

    /// The scratch directory downloads land in.
    pub fn scratch(&self) -> &ScratchDirectory {
        &self.scratch
    }

    /// Loads (and caches) the service descriptor.
    pub async fn load_descriptor(
        &mut self,
    ) -> Result<&FeatureServiceDescriptor, NegotiationError> {
        let descriptor = match self.descriptor.take() {
            Some(descriptor) => descriptor,
            None => self.client.load_descriptor().await?,
        };
        Ok(self.descriptor.insert(descriptor))
    }

    /// Populates the map with the service's online layers.
    ///
    /// Clears the operational layer list first, then adds one layer per
    /// descriptor entry in the configured presentation order.
    pub async fn stage_online_layers(
        &mut self,
        map: &mut impl MapSurface,
    ) -> Result<(), NegotiationError> {
        let order = self.config.layer_order();
        let descriptor = self.load_descriptor().await?;

        map.clear_layers();
        let layers = descriptor.layers.iter();
        let staged: Vec<FeatureLayer> = match order {
            LayerOrder::Declared => layers
                .map(|l| FeatureLayer::online(l.name.clone(), l.id))
                .collect(),
            LayerOrder::ReverseDeclared => layers
                .rev()
                .map(|l| FeatureLayer::online(l.name.clone(), l.id))
                .collect(),
        };
        let count = staged.len();
        for layer in staged {
            map.add_layer(layer);
        }

        info!(layers = count, "online layers staged");
        Ok(())
    }

    /// Replaces the map's layers with the snapshot's offline layers.
    ///
    /// Only geometry-bearing tables are surfaced; attribute-only tables
    /// stay queryable in the geodatabase but are not rendered.
    pub fn stage_offline_layers(&self, geodatabase: &LocalGeodatabase, map: &mut impl MapSurface) {
        map.clear_layers();
        let candidates = geodatabase.layer_candidates(self.config.layer_order());
        let count = candidates.len();
        for table in candidates {
            map.add_layer(FeatureLayer::offline(table.name.clone(), table.name.clone()));
        }
        info!(layers = count, path = %geodatabase.path().display(), "offline layers staged");
    }

    /// Starts a snapshot download for the map's visible extent.
    ///
    /// Fails without side effects when the viewport has no extent, when
    /// a job is already active, or when parameter negotiation fails.
    /// On success the returned handle is also retained as the active
    /// job; a watcher task clears the slot and notifies the listener
    /// when the job reaches a terminal state.
    pub async fn start_sync(&self, map: &impl MapSurface) -> Result<JobHandle, SyncStartError> {
        let extent = map.visible_extent().ok_or_else(|| {
            warn!("sync requested with no established viewport extent");
            SyncStartError::ExtentUnavailable
        })?;

        // Reserve the slot before any await so concurrent attempts
        // cannot both pass the check.
        {
            let mut slot = self.lock_active();
            if slot.is_busy() {
                debug!("sync rejected: job already active");
                return Err(SyncStartError::JobAlreadyActive);
            }
            *slot = ActiveSlot::Starting;
        }

        let params = match self.client.default_snapshot_parameters(extent).await {
            Ok(mut params) => {
                params.include_attachments = self.config.include_attachments();
                params
            }
            Err(e) => {
                error!(error = %e, "parameter negotiation failed");
                *self.lock_active() = ActiveSlot::Idle;
                return Err(e.into());
            }
        };

        let destination = self.scratch.snapshot_path();
        info!(extent = %extent, destination = %destination.display(), "starting sync job");

        let handle = DownloadJob::start(self.client.clone(), params, destination, self.config);
        *self.lock_active() = ActiveSlot::Running(handle.clone());

        self.spawn_watcher(handle.clone());
        Ok(handle)
    }

    /// Cancels the active job, if any. No-op otherwise.
    pub fn cancel_active(&self) {
        if let ActiveSlot::Running(handle) = &*self.lock_active() {
            info!("canceling active sync job");
            handle.cancel();
        }
    }

    /// Handle to the active job, if one is running.
    pub fn active_job(&self) -> Option<JobHandle> {
        match &*self.lock_active() {
            ActiveSlot::Running(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, ActiveSlot> {
        // Slot operations never panic while holding the lock.
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Forwards job events to the listener and clears the active slot
    /// on the terminal event.
    fn spawn_watcher(&self, handle: JobHandle) {
        let active = self.active.clone();
        let listener = self.listener.clone();

        tokio::spawn(async move {
            let mut status_rx = handle.status_watch();
            let mut progress_rx = handle.progress_watch();
            let mut waiter = handle.clone();

            loop {
                // The job may have reached a terminal state before this
                // task subscribed; changed() alone would then never fire.
                let current = *status_rx.borrow();
                if current.is_terminal() {
                    notify(&listener, |l| l.on_status(current));
                    break;
                }

                tokio::select! {
                    changed = status_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let status = *status_rx.borrow();
                        notify(&listener, |l| l.on_status(status));
                        if status.is_terminal() {
                            break;
                        }
                    }
                    changed = progress_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let fraction = *progress_rx.borrow();
                        notify(&listener, |l| l.on_progress(fraction));
                    }
                }
            }

            let outcome = waiter.wait().await;

            // Clear the slot before notifying so a listener reacting to
            // the terminal event can immediately start a new sync.
            {
                let mut slot = match active.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *slot = ActiveSlot::Idle;
            }

            notify(&listener, |l| l.on_sync_complete(&outcome));
        });
    }
}

/// Delivers an event to the listener if it is still alive.
fn notify(listener: &Option<Weak<dyn SyncListener>>, event: impl FnOnce(&dyn SyncListener)) {
    if let Some(listener) = listener.as_ref().and_then(Weak::upgrade) {
        event(listener.as_ref());
    }
}
