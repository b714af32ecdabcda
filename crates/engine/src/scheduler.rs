//! Polling scheduler
//!
//! Two named, independently paced timers drive the engine's periodic
//! work: `cluster-refresh` re-pulls the overview and resource panels,
//! `metrics-refresh` re-pulls the selected target's metrics. Each
//! timer is re-entrancy guarded (a tick that fires while the previous
//! tick's fetch is still outstanding is skipped, never queued) and
//! independently restartable. Every tick body runs epoch-guarded
//! through the coordinator, so stopping timers on context changes is
//! hygiene, not a correctness requirement.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::coordinator::ContextSwitchCoordinator;
use crate::models::EngineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerName {
    ClusterRefresh,
    MetricsRefresh,
}

impl TimerName {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerName::ClusterRefresh => "cluster-refresh",
            TimerName::MetricsRefresh => "metrics-refresh",
        }
    }
}

impl fmt::Display for TimerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cluster-refresh" => Ok(TimerName::ClusterRefresh),
            "metrics-refresh" => Ok(TimerName::MetricsRefresh),
            other => Err(format!("unknown timer name: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub cluster_interval: Duration,
    pub metrics_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cluster_interval: Duration::from_secs(30),
            metrics_interval: Duration::from_secs(10),
        }
    }
}

struct TimerState {
    interval: Duration,
    enabled: bool,
    handle: Option<JoinHandle<()>>,
    in_flight: Arc<AtomicBool>,
}

impl TimerState {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            enabled: true,
            handle: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    fn clear(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn running(&self) -> bool {
        self.handle.is_some()
    }
}

struct TimerTable {
    cluster: TimerState,
    metrics: TimerState,
    /// Whether the scheduler is attached to an active context.
    started: bool,
}

impl TimerTable {
    fn get_mut(&mut self, name: TimerName) -> &mut TimerState {
        match name {
            TimerName::ClusterRefresh => &mut self.cluster,
            TimerName::MetricsRefresh => &mut self.metrics,
        }
    }
}

pub struct PollingScheduler {
    coordinator: Arc<ContextSwitchCoordinator>,
    timers: Mutex<TimerTable>,
}

impl PollingScheduler {
    pub fn new(coordinator: Arc<ContextSwitchCoordinator>, config: SchedulerConfig) -> Arc<Self> {
        Arc::new(Self {
            coordinator,
            timers: Mutex::new(TimerTable {
                cluster: TimerState::new(config.cluster_interval),
                metrics: TimerState::new(config.metrics_interval),
                started: false,
            }),
        })
    }

    /// (Re)start all enabled timers. Idempotent: timers already
    /// running keep their schedule.
    pub fn start(self: &Arc<Self>) {
        let mut timers = self.timers.lock().unwrap();
        timers.started = true;
        for name in [TimerName::ClusterRefresh, TimerName::MetricsRefresh] {
            let state = timers.get_mut(name);
            if state.enabled && !state.running() {
                self.respawn(state, name, false);
            }
        }
    }

    /// Clear every scheduled tick. In-flight fetches are left to run
    /// to completion; the epoch guard discards their results if the
    /// context has moved on.
    pub fn stop(&self) {
        let mut timers = self.timers.lock().unwrap();
        if !timers.started && !timers.cluster.running() && !timers.metrics.running() {
            return;
        }
        timers.started = false;
        timers.cluster.clear();
        timers.metrics.clear();
        debug!("polling timers cleared");
    }

    /// Atomically cancel and reschedule one timer with a new interval.
    /// The other timer and any in-flight fetch are untouched.
    pub fn set_interval(self: &Arc<Self>, name: TimerName, interval: Duration) {
        let mut timers = self.timers.lock().unwrap();
        let started = timers.started;
        let state = timers.get_mut(name);
        state.interval = interval;
        if started && state.enabled {
            self.respawn(state, name, false);
        }
        info!(
            timer = name.as_str(),
            interval_ms = interval.as_millis() as u64,
            "timer interval updated"
        );
    }

    /// Disabling clears the scheduled tick; re-enabling while attached
    /// fires immediately and then on the configured interval.
    pub fn set_enabled(self: &Arc<Self>, name: TimerName, enabled: bool) {
        let mut timers = self.timers.lock().unwrap();
        let started = timers.started;
        let state = timers.get_mut(name);
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;
        if enabled {
            info!(timer = name.as_str(), "timer enabled");
            if started {
                self.respawn(state, name, true);
            }
        } else {
            state.clear();
            info!(timer = name.as_str(), "timer disabled");
        }
    }

    pub fn is_enabled(&self, name: TimerName) -> bool {
        self.timers.lock().unwrap().get_mut(name).enabled
    }

    fn respawn(self: &Arc<Self>, state: &mut TimerState, name: TimerName, immediate: bool) {
        state.clear();
        let first_tick = if immediate {
            Instant::now()
        } else {
            Instant::now() + state.interval
        };
        let scheduler = Arc::clone(self);
        let in_flight = Arc::clone(&state.in_flight);
        let interval = state.interval;

        state.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // At most one outstanding fetch per timer: skip, never
                // queue.
                if in_flight.swap(true, Ordering::SeqCst) {
                    debug!(timer = name.as_str(), "previous tick still in flight, skipping");
                    continue;
                }
                let coordinator = Arc::clone(&scheduler.coordinator);
                let in_flight = Arc::clone(&in_flight);
                tokio::spawn(async move {
                    match name {
                        TimerName::ClusterRefresh => coordinator.refresh_tick().await,
                        TimerName::MetricsRefresh => coordinator.refresh_metrics().await,
                    }
                    in_flight.store(false, Ordering::SeqCst);
                });
            }
        }));
    }

    /// Follow the coordinator's published state: timers run while a
    /// context is active, and are cleared when the context fails, goes
    /// idle, or a switch to a *different* context begins.
    pub fn spawn_state_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let mut rx = self.coordinator.subscribe();
        tokio::spawn(async move {
            let mut last_active: Option<String> = None;
            loop {
                let state = rx.borrow_and_update().state.clone();
                match state {
                    EngineState::Active { context } => {
                        if last_active.as_deref() != Some(context.as_str()) {
                            info!(context = %context, "context active, polling timers attached");
                        }
                        scheduler.start();
                        last_active = Some(context);
                    }
                    EngineState::Switching { context } => {
                        if last_active.as_deref().is_some_and(|previous| previous != context) {
                            // Old context abandoned; clear its timers
                            // before the new switch's results land.
                            scheduler.stop();
                            last_active = None;
                        }
                    }
                    EngineState::Failed { .. } | EngineState::Idle => {
                        scheduler.stop();
                        last_active = None;
                    }
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
