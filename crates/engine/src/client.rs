//! Cluster-client collaborator seam
//!
//! The engine never talks to a Kubernetes API server directly; it
//! consumes this narrow trait. The production implementation wraps the
//! real cluster client, tests substitute mocks. Errors cross this
//! boundary as `anyhow::Error` and are mapped into the engine taxonomy
//! at the call site.

use anyhow::Result;
use async_trait::async_trait;

use crate::metrics::MetricsSample;
use crate::models::{ClusterOverview, MetricsTarget, ResourceKind, ResourceSummary};

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Point the client at a named context. Cheap; does not verify
    /// reachability.
    async fn set_context(&self, name: &str) -> Result<()>;

    /// Cheap reachability check, e.g. a list-nodes call with a small
    /// page size. Expected to be materially faster than a full
    /// overview fetch.
    async fn probe_connectivity(&self) -> Result<()>;

    async fn get_cluster_overview(&self) -> Result<ClusterOverview>;

    async fn get_resource_list(&self, kind: ResourceKind) -> Result<Vec<ResourceSummary>>;

    async fn get_metrics_snapshot(&self, target: &MetricsTarget) -> Result<MetricsSample>;

    /// Real time-series history, when the cluster has a backend for
    /// it. `Ok(None)` (the default) sends the engine down the
    /// synthesizer path instead.
    async fn get_metrics_history(
        &self,
        _target: &MetricsTarget,
        _duration_minutes: u32,
    ) -> Result<Option<Vec<MetricsSample>>> {
        Ok(None)
    }

    async fn check_metrics_availability(&self) -> Result<bool>;
}
