//! Engine facade
//!
//! One handle that wires the coordinator, the polling scheduler, and
//! the state watcher together. UI glue holds an `Engine` and a
//! snapshot receiver; everything else is internal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::client::ClusterClient;
use crate::config::EngineConfig;
use crate::coordinator::ContextSwitchCoordinator;
use crate::epoch::Epoch;
use crate::models::{EngineSnapshot, MetricsTarget};
use crate::scheduler::{PollingScheduler, TimerName};

pub struct Engine {
    coordinator: Arc<ContextSwitchCoordinator>,
    scheduler: Arc<PollingScheduler>,
    watcher: JoinHandle<()>,
}

impl Engine {
    /// Wire up the engine against a cluster client. Polling timers
    /// attach automatically once a context becomes active.
    pub fn new(client: Arc<dyn ClusterClient>, config: EngineConfig) -> Self {
        let coordinator = ContextSwitchCoordinator::new(client, config.coordinator());
        let scheduler = PollingScheduler::new(Arc::clone(&coordinator), config.scheduler());
        let watcher = scheduler.spawn_state_watcher();
        info!("sync engine started");
        Self {
            coordinator,
            scheduler,
            watcher,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.coordinator.subscribe()
    }

    /// Switch (or retry) the active context. Returns the epoch minted
    /// for this attempt; any earlier in-flight work is superseded.
    pub fn switch_context(&self, context: impl Into<String>) -> Epoch {
        self.coordinator.switch_context(context)
    }

    pub fn set_refresh_interval(&self, timer: TimerName, secs: u64) {
        self.scheduler
            .set_interval(timer, Duration::from_secs(secs.max(1)));
    }

    pub fn set_timer_enabled(&self, timer: TimerName, enabled: bool) {
        self.scheduler.set_enabled(timer, enabled);
    }

    pub fn set_metrics_target(&self, target: Option<MetricsTarget>) {
        self.coordinator.set_metrics_target(target);
    }

    pub fn set_metrics_duration(&self, minutes: u32) {
        self.coordinator.set_metrics_duration(minutes);
    }

    /// Stop all timers and the state watcher. In-flight fetches drain
    /// on their own; the epoch guard keeps their results out of the
    /// snapshot once a later switch begins.
    pub fn shutdown(&self) {
        self.watcher.abort();
        self.scheduler.stop();
        info!("sync engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.watcher.abort();
        self.scheduler.stop();
    }
}
