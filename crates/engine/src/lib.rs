//! Kuboard sync engine
//!
//! Keeps a desktop dashboard's view of a Kubernetes cluster live and
//! consistent: context switches run through a checkpointed state
//! machine, every async fetch is epoch-guarded so stale results from
//! abandoned contexts are discarded rather than rendered, and two
//! named polling timers keep the overview, resource panels, and
//! metrics chart fresh without overlapping fetches.
//!
//! The UI consumes a single [`models::EngineSnapshot`] published on a
//! watch channel; the cluster itself is reached only through the
//! [`client::ClusterClient`] trait.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod metrics;
pub mod models;
pub mod quantity;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::ClusterClient;
pub use config::EngineConfig;
pub use coordinator::{ContextSwitchCoordinator, CoordinatorConfig};
pub use engine::Engine;
pub use epoch::{Epoch, EpochGate, LoadResult};
pub use error::EngineError;
pub use metrics::{MetricsHistory, MetricsSample};
pub use models::{
    ClusterInfo, ClusterOverview, EngineSnapshot, EngineState, MetricsTarget, ResourceKind,
    ResourceSummary,
};
pub use scheduler::{PollingScheduler, SchedulerConfig, TimerName};
