//! Context switch coordination
//!
//! Owns the active-context identity and drives every switch through
//! three sequential checkpoints: set-context + bounded connectivity
//! probe, cluster overview fetch, then parallel resource detail
//! fetches. Each checkpoint re-checks the epoch it started under, so a
//! switch that has been superseded by a newer one silently stops no
//! matter how far it got. There is no explicit cancellation: stale
//! work runs to completion and its results are discarded at the gate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::epoch::{Epoch, EpochGate, LoadResult};
use crate::error::EngineError;
use crate::metrics::{self, MetricsHistory};
use crate::models::{ClusterOverview, EngineSnapshot, EngineState, MetricsTarget, ResourceKind, ResourceSummary};

/// Timeout and history budgets for the coordinator. The probe timeout
/// is materially shorter than the overview timeout so a dead cluster
/// fails fast before the expensive call is attempted.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub probe_timeout: Duration,
    pub overview_timeout: Duration,
    pub resource_timeout: Duration,
    pub metrics_timeout: Duration,
    pub history_duration_minutes: u32,
    pub history_max_points: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(3),
            overview_timeout: Duration::from_secs(5),
            resource_timeout: Duration::from_secs(5),
            metrics_timeout: Duration::from_secs(5),
            history_duration_minutes: 60,
            history_max_points: 30,
        }
    }
}

#[derive(Debug, Clone)]
struct MetricsSettings {
    target: Option<MetricsTarget>,
    duration_minutes: u32,
}

pub struct ContextSwitchCoordinator {
    /// Exclusive owner of the cluster client handle. Every fetch goes
    /// through [`Self::client_for`], which refuses stale epochs.
    client: Arc<dyn ClusterClient>,
    gate: EpochGate,
    config: CoordinatorConfig,
    snapshot_tx: watch::Sender<EngineSnapshot>,
    metrics_settings: Mutex<MetricsSettings>,
}

impl ContextSwitchCoordinator {
    pub fn new(client: Arc<dyn ClusterClient>, config: CoordinatorConfig) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(EngineSnapshot::default());
        let duration_minutes = config.history_duration_minutes;
        Arc::new(Self {
            client,
            gate: EpochGate::new(),
            config,
            snapshot_tx,
            metrics_settings: Mutex::new(MetricsSettings {
                target: None,
                duration_minutes,
            }),
        })
    }

    /// Observable state for the UI layer.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn current_epoch(&self) -> Epoch {
        self.gate.current()
    }

    /// Hand back the client for epoch `epoch`, or refuse if that epoch
    /// has been superseded. No component may touch the client except
    /// through this accessor.
    fn client_for(&self, epoch: Epoch) -> Result<Arc<dyn ClusterClient>, EngineError> {
        if self.gate.is_current(epoch) {
            Ok(Arc::clone(&self.client))
        } else {
            Err(EngineError::Superseded)
        }
    }

    /// Every snapshot write funnels through here. The epoch re-check
    /// runs inside the watch sender's critical section, which is the
    /// engine's single serialization boundary for published state. A
    /// superseded write is dropped without notifying subscribers.
    fn publish_if_current<F>(&self, epoch: Epoch, update: F)
    where
        F: FnOnce(&mut EngineSnapshot),
    {
        self.snapshot_tx.send_if_modified(|snapshot| {
            if self.gate.is_current(epoch) {
                update(snapshot);
                true
            } else {
                false
            }
        });
    }

    /// Epoch to refresh under, derived from the published snapshot: the
    /// engine must be `Active` and the snapshot must belong to the
    /// epoch that is still current. A tick that lands in the window
    /// between a new switch minting its epoch and publishing
    /// `Switching` sees the mismatch and backs off instead of fetching
    /// under the old context with the new epoch.
    fn refresh_epoch(&self) -> Option<Epoch> {
        let epoch = self.gate.current();
        let snapshot = self.snapshot_tx.borrow();
        if snapshot.state.is_active() && snapshot.epoch == epoch.value() {
            Some(epoch)
        } else {
            None
        }
    }

    /// Begin switching to `context`. Mints a fresh epoch, instantly
    /// superseding all in-flight work from earlier switches, and
    /// drives the checkpoints on a background task. Retrying a failed
    /// context is this same operation.
    pub fn switch_context(self: &Arc<Self>, context: impl Into<String>) -> Epoch {
        let context = context.into();
        let epoch = self.gate.begin();
        info!(context = %context, epoch = epoch.value(), "context switch requested");

        self.publish_if_current(epoch, |snapshot| {
            snapshot.state = EngineState::Switching {
                context: context.clone(),
            };
            snapshot.epoch = epoch.value();
            snapshot.overview = None;
            snapshot.resources.clear();
            snapshot.metrics = None;
            snapshot.metrics_available = false;
            snapshot.last_error = None;
        });

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run_switch(epoch, context).await;
        });
        epoch
    }

    async fn run_switch(self: Arc<Self>, epoch: Epoch, context: String) {
        // Checkpoint 1: provisional client target + bounded probe.
        if let Err(err) = self.connect_and_probe(epoch, &context).await {
            self.fail_switch(epoch, &context, err);
            return;
        }

        // Checkpoint 2: cluster overview, epoch-guarded.
        let overview = match self.gate.run_guarded(epoch, self.fetch_overview(epoch)).await {
            LoadResult::Ok(overview) => overview,
            LoadResult::Err(err) => {
                self.fail_switch(epoch, &context, err);
                return;
            }
            LoadResult::Superseded | LoadResult::Pending => {
                debug!(context = %context, epoch = epoch.value(), "switch superseded before overview landed");
                return;
            }
        };

        // Checkpoint 3: active as soon as the overview lands; detail
        // panels fill in incrementally behind it.
        info!(context = %context, epoch = epoch.value(), "context active");
        self.publish_if_current(epoch, |snapshot| {
            snapshot.state = EngineState::Active {
                context: context.clone(),
            };
            snapshot.overview = Some(overview);
            for kind in ResourceKind::ALL {
                snapshot.resources.insert(kind, LoadResult::Pending);
            }
        });
        self.spawn_resource_loads(epoch);
    }

    fn fail_switch(&self, epoch: Epoch, context: &str, err: EngineError) {
        if err.is_superseded() {
            debug!(context = %context, epoch = epoch.value(), "switch superseded");
            return;
        }
        warn!(context = %context, epoch = epoch.value(), error = %err, "context switch failed");
        let reason = err.to_string();
        self.publish_if_current(epoch, move |snapshot| {
            snapshot.state = EngineState::Failed {
                context: context.to_string(),
                reason: reason.clone(),
            };
            snapshot.last_error = Some(reason);
        });
    }

    async fn connect_and_probe(&self, epoch: Epoch, context: &str) -> Result<(), EngineError> {
        let client = self.client_for(epoch)?;
        let probe_timeout = self.config.probe_timeout;
        let timeout_ms = probe_timeout.as_millis() as u64;

        match timeout(probe_timeout, client.set_context(context)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(EngineError::Connectivity {
                    reason: err.to_string(),
                })
            }
            Err(_) => return Err(EngineError::ConnectivityTimeout { timeout_ms }),
        }

        match timeout(probe_timeout, client.probe_connectivity()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(EngineError::Connectivity {
                reason: err.to_string(),
            }),
            Err(_) => Err(EngineError::ConnectivityTimeout { timeout_ms }),
        }
    }

    async fn fetch_overview(&self, epoch: Epoch) -> Result<ClusterOverview, EngineError> {
        let client = self.client_for(epoch)?;
        match timeout(self.config.overview_timeout, client.get_cluster_overview()).await {
            Ok(Ok(overview)) => Ok(overview),
            Ok(Err(err)) => Err(EngineError::OverviewFetch {
                reason: err.to_string(),
            }),
            Err(_) => Err(EngineError::OverviewFetch {
                reason: format!(
                    "timed out after {}ms",
                    self.config.overview_timeout.as_millis()
                ),
            }),
        }
    }

    /// Fetch all resource detail panels in parallel, each independently
    /// epoch-guarded. A per-kind failure surfaces on that panel alone.
    fn spawn_resource_loads(self: &Arc<Self>, epoch: Epoch) {
        for kind in ResourceKind::ALL {
            let coordinator = Arc::clone(self);
            tokio::spawn(async move {
                let result = coordinator
                    .gate
                    .run_guarded(epoch, coordinator.fetch_resource(epoch, kind))
                    .await;
                match result {
                    LoadResult::Ok(items) => {
                        coordinator.publish_if_current(epoch, move |snapshot| {
                            snapshot.resources.insert(kind, LoadResult::Ok(items));
                        });
                    }
                    LoadResult::Err(err) => {
                        warn!(kind = %kind, error = %err, "resource list fetch failed");
                        coordinator.publish_if_current(epoch, move |snapshot| {
                            snapshot.resources.insert(kind, LoadResult::Err(err));
                        });
                    }
                    LoadResult::Superseded | LoadResult::Pending => {}
                }
            });
        }
    }

    async fn fetch_resource(
        &self,
        epoch: Epoch,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceSummary>, EngineError> {
        let client = self.client_for(epoch)?;
        match timeout(self.config.resource_timeout, client.get_resource_list(kind)).await {
            Ok(Ok(items)) => Ok(items),
            Ok(Err(err)) => Err(EngineError::ResourceFetch {
                kind,
                reason: err.to_string(),
            }),
            Err(_) => Err(EngineError::ResourceFetch {
                kind,
                reason: format!(
                    "timed out after {}ms",
                    self.config.resource_timeout.as_millis()
                ),
            }),
        }
    }

    /// Cluster-refresh timer entry point. No-op without an active
    /// context. Refresh errors keep the `Active` state and existing
    /// panels; they only update `last_error`.
    pub async fn refresh_tick(self: &Arc<Self>) {
        let Some(epoch) = self.refresh_epoch() else {
            return;
        };

        match self.gate.run_guarded(epoch, self.fetch_overview(epoch)).await {
            LoadResult::Ok(overview) => {
                self.publish_if_current(epoch, move |snapshot| {
                    snapshot.overview = Some(overview);
                    snapshot.last_error = None;
                });
            }
            LoadResult::Err(err) => {
                warn!(error = %err, "cluster refresh failed");
                self.publish_if_current(epoch, move |snapshot| {
                    snapshot.last_error = Some(err.to_string());
                });
                return;
            }
            LoadResult::Superseded | LoadResult::Pending => return,
        }

        // Panels keep their previous contents until the refetch lands;
        // no Pending flicker on periodic refresh.
        self.spawn_resource_loads(epoch);
    }

    /// Metrics-refresh timer entry point. No-op without an active
    /// context and a selected target. Metrics trouble is never a hard
    /// failure: an absent metrics server yields synthesized history
    /// with `metrics_available = false`, and fetch errors keep the
    /// last published series.
    pub async fn refresh_metrics(self: &Arc<Self>) {
        let Some(epoch) = self.refresh_epoch() else {
            return;
        };
        let (target, duration_minutes) = {
            let settings = self.metrics_settings.lock().unwrap();
            (settings.target.clone(), settings.duration_minutes)
        };
        let Some(target) = target else { return };

        match self
            .gate
            .run_guarded(epoch, self.fetch_metrics(epoch, &target, duration_minutes))
            .await
        {
            LoadResult::Ok((history, available)) => {
                self.publish_if_current(epoch, move |snapshot| {
                    snapshot.metrics = Some(history);
                    snapshot.metrics_available = available;
                });
            }
            LoadResult::Err(err) => {
                warn!(target = %target.name(), error = %err, "metrics refresh failed");
            }
            LoadResult::Superseded | LoadResult::Pending => {}
        }
    }

    async fn fetch_metrics(
        &self,
        epoch: Epoch,
        target: &MetricsTarget,
        duration_minutes: u32,
    ) -> Result<(MetricsHistory, bool), EngineError> {
        let client = self.client_for(epoch)?;
        let metrics_timeout = self.config.metrics_timeout;
        let max_points = self.config.history_max_points;

        let available = match timeout(metrics_timeout, client.check_metrics_availability()).await {
            Ok(Ok(available)) => available,
            Ok(Err(err)) => {
                debug!(error = %err, "metrics availability check failed");
                false
            }
            Err(_) => false,
        };

        if !available {
            // No metrics server: chart synthesized placeholder data and
            // let the UI show its hint.
            let sample = metrics::placeholder_sample(Utc::now().timestamp());
            let history = metrics::synthesize_history(&sample, duration_minutes, max_points);
            return Ok((history, false));
        }

        // A real time-series backend bypasses the synthesizer entirely.
        if let Ok(Ok(Some(series))) = timeout(
            metrics_timeout,
            client.get_metrics_history(target, duration_minutes),
        )
        .await
        {
            let history = MetricsHistory::from_series(series, duration_minutes, max_points);
            return Ok((history, true));
        }

        match timeout(metrics_timeout, client.get_metrics_snapshot(target)).await {
            Ok(Ok(sample)) => {
                let history = metrics::synthesize_history(&sample, duration_minutes, max_points);
                Ok((history, true))
            }
            Ok(Err(_)) | Err(_) => Err(EngineError::MetricsUnavailable),
        }
    }

    pub fn set_metrics_target(self: &Arc<Self>, target: Option<MetricsTarget>) {
        {
            self.metrics_settings.lock().unwrap().target = target;
        }
        self.reset_metrics_history();
    }

    pub fn set_metrics_duration(self: &Arc<Self>, minutes: u32) {
        {
            self.metrics_settings.lock().unwrap().duration_minutes = minutes.max(1);
        }
        self.reset_metrics_history();
    }

    /// The published history is replaced wholesale, never mutated in
    /// place: drop it now, then refetch under the current epoch.
    fn reset_metrics_history(self: &Arc<Self>) {
        let epoch = self.gate.current();
        self.publish_if_current(epoch, |snapshot| {
            snapshot.metrics = None;
        });
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.refresh_metrics().await;
        });
    }
}
