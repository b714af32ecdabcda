//! Engine configuration
//!
//! All knobs are plain seconds/counts so they deserialize cleanly from
//! environment variables. `KUBOARD_` is the env prefix, e.g.
//! `KUBOARD_CLUSTER_REFRESH_SECS=15`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::coordinator::CoordinatorConfig;
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Connectivity probe budget; kept well under the overview budget
    /// so dead clusters fail fast.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_overview_timeout_secs")]
    pub overview_timeout_secs: u64,

    #[serde(default = "default_resource_timeout_secs")]
    pub resource_timeout_secs: u64,

    #[serde(default = "default_metrics_timeout_secs")]
    pub metrics_timeout_secs: u64,

    /// Period of the `cluster-refresh` timer.
    #[serde(default = "default_cluster_refresh_secs")]
    pub cluster_refresh_secs: u64,

    /// Period of the `metrics-refresh` timer.
    #[serde(default = "default_metrics_refresh_secs")]
    pub metrics_refresh_secs: u64,

    /// Window the metrics chart covers.
    #[serde(default = "default_history_duration_minutes")]
    pub history_duration_minutes: u32,

    /// Hard cap on chart points, regardless of window length.
    #[serde(default = "default_history_max_points")]
    pub history_max_points: usize,
}

fn default_probe_timeout_secs() -> u64 {
    3
}

fn default_overview_timeout_secs() -> u64 {
    5
}

fn default_resource_timeout_secs() -> u64 {
    5
}

fn default_metrics_timeout_secs() -> u64 {
    5
}

fn default_cluster_refresh_secs() -> u64 {
    30
}

fn default_metrics_refresh_secs() -> u64 {
    10
}

fn default_history_duration_minutes() -> u32 {
    60
}

fn default_history_max_points() -> usize {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout_secs(),
            overview_timeout_secs: default_overview_timeout_secs(),
            resource_timeout_secs: default_resource_timeout_secs(),
            metrics_timeout_secs: default_metrics_timeout_secs(),
            cluster_refresh_secs: default_cluster_refresh_secs(),
            metrics_refresh_secs: default_metrics_refresh_secs(),
            history_duration_minutes: default_history_duration_minutes(),
            history_max_points: default_history_max_points(),
        }
    }
}

impl EngineConfig {
    /// Load from `KUBOARD_*` environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn load() -> Self {
        let built = config::Config::builder()
            .add_source(config::Environment::with_prefix("KUBOARD"))
            .build();

        match built.and_then(|cfg| cfg.try_deserialize()) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "failed to load engine config from environment, using defaults");
                Self::default()
            }
        }
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            overview_timeout: Duration::from_secs(self.overview_timeout_secs),
            resource_timeout: Duration::from_secs(self.resource_timeout_secs),
            metrics_timeout: Duration::from_secs(self.metrics_timeout_secs),
            history_duration_minutes: self.history_duration_minutes.max(1),
            history_max_points: self.history_max_points.max(1),
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            cluster_interval: Duration::from_secs(self.cluster_refresh_secs.max(1)),
            metrics_interval: Duration::from_secs(self.metrics_refresh_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.probe_timeout_secs, 3);
        assert_eq!(config.cluster_refresh_secs, 30);
        assert_eq!(config.metrics_refresh_secs, 10);
        assert_eq!(config.history_max_points, 30);
    }

    #[test]
    fn test_conversions_clamp_zeroes() {
        let config = EngineConfig {
            cluster_refresh_secs: 0,
            history_duration_minutes: 0,
            history_max_points: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.scheduler().cluster_interval, Duration::from_secs(1));
        assert_eq!(config.coordinator().history_duration_minutes, 1);
        assert_eq!(config.coordinator().history_max_points, 1);
    }

    #[test]
    fn test_deserializes_partial_overrides() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"cluster_refresh_secs": 15}"#).unwrap();
        assert_eq!(config.cluster_refresh_secs, 15);
        assert_eq!(config.overview_timeout_secs, 5);
    }
}
