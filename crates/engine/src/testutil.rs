//! Shared test support: a scriptable mock cluster client and watch
//! helpers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::watch;

use crate::client::ClusterClient;
use crate::metrics::MetricsSample;
use crate::models::{
    ClusterInfo, ClusterOverview, EngineSnapshot, MetricsTarget, ResourceKind, ResourceSummary,
};

/// Per-context script for the mock client.
#[derive(Debug, Clone)]
pub struct ContextBehavior {
    pub probe_delay: Duration,
    pub probe_fails: bool,
    pub overview_delay: Duration,
    pub overview_fails: bool,
    pub node_count: usize,
    pub fail_kinds: Vec<ResourceKind>,
    pub metrics_available: bool,
    pub sample: Option<MetricsSample>,
    pub real_series: Option<Vec<MetricsSample>>,
}

impl Default for ContextBehavior {
    fn default() -> Self {
        Self {
            probe_delay: Duration::ZERO,
            probe_fails: false,
            overview_delay: Duration::ZERO,
            overview_fails: false,
            node_count: 1,
            fail_kinds: Vec::new(),
            metrics_available: false,
            sample: None,
            real_series: None,
        }
    }
}

pub struct MockClient {
    contexts: Mutex<HashMap<String, ContextBehavior>>,
    active: Mutex<String>,
    overview_calls: AtomicUsize,
    overview_in_flight: AtomicUsize,
    overview_max_in_flight: AtomicUsize,
    metrics_calls: AtomicUsize,
}

impl MockClient {
    pub fn new(contexts: Vec<(&str, ContextBehavior)>) -> Self {
        Self {
            contexts: Mutex::new(
                contexts
                    .into_iter()
                    .map(|(name, behavior)| (name.to_string(), behavior))
                    .collect(),
            ),
            active: Mutex::new(String::new()),
            overview_calls: AtomicUsize::new(0),
            overview_in_flight: AtomicUsize::new(0),
            overview_max_in_flight: AtomicUsize::new(0),
            metrics_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_behavior(&self, context: &str, behavior: ContextBehavior) {
        self.contexts
            .lock()
            .unwrap()
            .insert(context.to_string(), behavior);
    }

    pub fn overview_calls(&self) -> usize {
        self.overview_calls.load(Ordering::SeqCst)
    }

    pub fn overview_max_in_flight(&self) -> usize {
        self.overview_max_in_flight.load(Ordering::SeqCst)
    }

    pub fn metrics_calls(&self) -> usize {
        self.metrics_calls.load(Ordering::SeqCst)
    }

    /// Behavior for the currently-set context, captured at call entry.
    fn active_behavior(&self) -> ContextBehavior {
        let active = self.active.lock().unwrap().clone();
        self.contexts
            .lock()
            .unwrap()
            .get(&active)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ClusterClient for MockClient {
    async fn set_context(&self, name: &str) -> Result<()> {
        *self.active.lock().unwrap() = name.to_string();
        Ok(())
    }

    async fn probe_connectivity(&self) -> Result<()> {
        let behavior = self.active_behavior();
        if !behavior.probe_delay.is_zero() {
            tokio::time::sleep(behavior.probe_delay).await;
        }
        if behavior.probe_fails {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }

    async fn get_cluster_overview(&self) -> Result<ClusterOverview> {
        let behavior = self.active_behavior();
        let context = self.active.lock().unwrap().clone();

        self.overview_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.overview_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.overview_max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        if !behavior.overview_delay.is_zero() {
            tokio::time::sleep(behavior.overview_delay).await;
        }
        self.overview_in_flight.fetch_sub(1, Ordering::SeqCst);

        if behavior.overview_fails {
            return Err(anyhow!("apiserver unreachable"));
        }
        Ok(ClusterOverview {
            cluster_info: ClusterInfo {
                name: context,
                server: "https://example:6443".to_string(),
                version: Some("1.29".to_string()),
            },
            node_count: behavior.node_count,
            namespace_count: 4,
            pod_count: 12,
            deployment_count: 3,
            kubernetes_version: Some("1.29".to_string()),
        })
    }

    async fn get_resource_list(&self, kind: ResourceKind) -> Result<Vec<ResourceSummary>> {
        let behavior = self.active_behavior();
        let context = self.active.lock().unwrap().clone();
        if behavior.fail_kinds.contains(&kind) {
            return Err(anyhow!("forbidden"));
        }
        Ok(vec![ResourceSummary {
            name: format!("{context}-{kind}-0"),
            namespace: Some("default".to_string()),
            status: "Ready".to_string(),
        }])
    }

    async fn get_metrics_snapshot(&self, _target: &MetricsTarget) -> Result<MetricsSample> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.active_behavior();
        behavior
            .sample
            .ok_or_else(|| anyhow!("no sample scripted"))
    }

    async fn get_metrics_history(
        &self,
        _target: &MetricsTarget,
        _duration_minutes: u32,
    ) -> Result<Option<Vec<MetricsSample>>> {
        Ok(self.active_behavior().real_series)
    }

    async fn check_metrics_availability(&self) -> Result<bool> {
        Ok(self.active_behavior().metrics_available)
    }
}

/// Await snapshots until `pred` holds, panicking after two seconds.
pub async fn wait_for<F>(rx: &mut watch::Receiver<EngineSnapshot>, pred: F)
where
    F: Fn(&EngineSnapshot) -> bool,
{
    let deadline = Duration::from_secs(2);
    let result = tokio::time::timeout(deadline, async {
        loop {
            if pred(&rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                panic!("snapshot channel closed while waiting");
            }
        }
    })
    .await;
    result.expect("timed out waiting for snapshot condition");
}
