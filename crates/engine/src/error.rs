//! Engine error taxonomy
//!
//! `ConnectivityTimeout`, `Connectivity` and `OverviewFetch` abort a
//! context switch and surface as its terminal failure. `ResourceFetch`
//! is per-panel and never fails the switch. `MetricsUnavailable` is
//! soft: the engine falls back to synthesized history. `Superseded` is
//! not an error at all and must never reach the UI.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ResourceKind;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    #[error("connectivity probe timed out after {timeout_ms}ms")]
    ConnectivityTimeout { timeout_ms: u64 },

    #[error("connectivity error: {reason}")]
    Connectivity { reason: String },

    #[error("cluster overview fetch failed: {reason}")]
    OverviewFetch { reason: String },

    #[error("failed to list {kind}: {reason}")]
    ResourceFetch {
        #[serde(rename = "resource_kind")]
        kind: ResourceKind,
        reason: String,
    },

    #[error("metrics server unavailable")]
    MetricsUnavailable,

    #[error("superseded by a newer context switch")]
    Superseded,
}

impl EngineError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, EngineError::Superseded)
    }
}
