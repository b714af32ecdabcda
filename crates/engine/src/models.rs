//! UI-facing data models for the sync engine

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::epoch::LoadResult;
use crate::metrics::MetricsHistory;

/// Resource kinds whose detail panels the engine keeps populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Nodes,
    Namespaces,
    Pods,
    Deployments,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Nodes,
        ResourceKind::Namespaces,
        ResourceKind::Pods,
        ResourceKind::Deployments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Nodes => "nodes",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::Pods => "pods",
            ResourceKind::Deployments => "deployments",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target a metrics poll is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricsTarget {
    Node { name: String },
    Pod { namespace: String, name: String },
}

impl MetricsTarget {
    pub fn name(&self) -> &str {
        match self {
            MetricsTarget::Node { name } => name,
            MetricsTarget::Pod { name, .. } => name,
        }
    }
}

/// One row in a resource detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    pub server: String,
    pub version: Option<String>,
}

/// Headline counts shown on the cluster overview page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOverview {
    pub cluster_info: ClusterInfo,
    pub node_count: usize,
    pub namespace_count: usize,
    pub pod_count: usize,
    pub deployment_count: usize,
    pub kubernetes_version: Option<String>,
}

/// Coordinator state machine, as seen by the UI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum EngineState {
    #[default]
    Idle,
    Switching {
        context: String,
    },
    Active {
        context: String,
    },
    Failed {
        context: String,
        reason: String,
    },
}

impl EngineState {
    pub fn context(&self) -> Option<&str> {
        match self {
            EngineState::Idle => None,
            EngineState::Switching { context }
            | EngineState::Active { context }
            | EngineState::Failed { context, .. } => Some(context),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Active { .. })
    }
}

/// The single observable document the engine publishes. Every field is
/// only ever written through an epoch-guarded publish, so a stale
/// context's data can never appear here, even momentarily.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub epoch: u64,
    pub overview: Option<ClusterOverview>,
    pub resources: BTreeMap<ResourceKind, LoadResult<Vec<ResourceSummary>>>,
    pub metrics: Option<MetricsHistory>,
    /// False while the metrics panel is running on synthesized
    /// placeholder data because no metrics server responded.
    pub metrics_available: bool,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_state_context() {
        assert_eq!(EngineState::Idle.context(), None);
        let active = EngineState::Active {
            context: "prod".to_string(),
        };
        assert_eq!(active.context(), Some("prod"));
        assert!(active.is_active());
    }

    #[test]
    fn test_snapshot_serializes_tagged_state() {
        let snapshot = EngineSnapshot {
            state: EngineState::Failed {
                context: "staging".to_string(),
                reason: "boom".to_string(),
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"]["phase"], "failed");
        assert_eq!(json["state"]["context"], "staging");
    }

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(ResourceKind::Pods.to_string(), "pods");
        assert_eq!(ResourceKind::ALL.len(), 4);
    }
}
