//! Metrics samples, bounded history, and the point-sample synthesizer
//!
//! The metrics server only serves current snapshots. When no real
//! time-series backend exists, [`synthesize_history`] turns a single
//! point sample into a bounded, chartable series. The one load-bearing
//! contract: the most recent point always equals the true current
//! sample exactly; every other point is the current reading perturbed
//! by a bounded factor so charts are not flat lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum relative perturbation applied to synthesized points.
const JITTER_BOUND: f64 = 0.15;

/// One poll's worth of readings for a single target. Immutable once
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    pub timestamp: i64,
    pub cpu_usage_cores: f64,
    pub cpu_capacity_cores: f64,
    pub memory_usage_bytes: u64,
    pub memory_capacity_bytes: u64,
    pub disk_usage_bytes: Option<u64>,
}

impl MetricsSample {
    pub fn cpu_usage_percent(&self) -> f64 {
        if self.cpu_capacity_cores > 0.0 {
            (self.cpu_usage_cores / self.cpu_capacity_cores * 100.0).min(100.0)
        } else {
            0.0
        }
    }

    pub fn memory_usage_percent(&self) -> f64 {
        if self.memory_capacity_bytes > 0 {
            (self.memory_usage_bytes as f64 / self.memory_capacity_bytes as f64 * 100.0).min(100.0)
        } else {
            0.0
        }
    }
}

/// A time-ascending, bounded series of samples for one (target,
/// duration) pair. Replaced wholesale on duration change, never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    pub points: Vec<MetricsSample>,
    pub duration_minutes: u32,
    /// True when the points were generated rather than read from a real
    /// time-series backend.
    pub synthesized: bool,
    pub last_updated: DateTime<Utc>,
}

impl MetricsHistory {
    /// Build a history from a real collaborator-provided series. Points
    /// are sorted by timestamp and truncated to the newest `max_points`
    /// (oldest dropped first); values are used unmodified.
    pub fn from_series(
        mut points: Vec<MetricsSample>,
        duration_minutes: u32,
        max_points: usize,
    ) -> Self {
        points.sort_by_key(|p| p.timestamp);
        if max_points > 0 && points.len() > max_points {
            points.drain(..points.len() - max_points);
        }
        Self {
            points,
            duration_minutes,
            synthesized: false,
            last_updated: Utc::now(),
        }
    }

    pub fn latest(&self) -> Option<&MetricsSample> {
        self.points.last()
    }
}

/// Produce a bounded series spanning `duration_minutes` and ending at
/// the current sample's timestamp, with exactly `max_points` evenly
/// spaced points. The last point is the supplied sample, untouched;
/// earlier points perturb it by a deterministic factor within
/// +/-[`JITTER_BOUND`].
pub fn synthesize_history(
    current: &MetricsSample,
    duration_minutes: u32,
    max_points: usize,
) -> MetricsHistory {
    let duration_minutes = duration_minutes.max(1);
    let count = max_points.max(1);
    let span_secs = i64::from(duration_minutes) * 60;
    let end = current.timestamp;

    let mut points = Vec::with_capacity(count);
    for index in 0..count {
        if index + 1 == count {
            points.push(current.clone());
            continue;
        }
        let remaining = (count - 1 - index) as i64;
        let timestamp = end - span_secs * remaining / (count - 1) as i64;
        let factor = jitter_factor(current.timestamp, index);
        points.push(MetricsSample {
            timestamp,
            cpu_usage_cores: (current.cpu_usage_cores * factor).max(0.0),
            cpu_capacity_cores: current.cpu_capacity_cores,
            memory_usage_bytes: (current.memory_usage_bytes as f64 * factor) as u64,
            memory_capacity_bytes: current.memory_capacity_bytes,
            disk_usage_bytes: current.disk_usage_bytes.map(|b| (b as f64 * factor) as u64),
        });
    }

    MetricsHistory {
        points,
        duration_minutes,
        synthesized: true,
        last_updated: Utc::now(),
    }
}

/// Bounded jitter from a sine mixture, seeded by the sample timestamp
/// so successive refreshes do not repeat the exact same curve. The
/// mixture weights sum to 1, keeping |wave| <= 1 and the factor within
/// [1 - JITTER_BOUND, 1 + JITTER_BOUND].
fn jitter_factor(seed: i64, index: usize) -> f64 {
    let t = index as f64 + seed.rem_euclid(97) as f64;
    let wave = (t * 1.7).sin() * 0.7 + (t * 0.31).cos() * 0.3;
    1.0 + wave * JITTER_BOUND
}

/// Fallback sample for when no metrics server exists in the cluster.
/// Smooth time-seeded patterns keep the chart alive while the UI shows
/// its "synthesized data" hint.
pub fn placeholder_sample(now: i64) -> MetricsSample {
    let t = now as f64 / 1000.0;
    let cpu_percent = (15.0 + (t * 0.1).sin() * 10.0 + (t * 0.3).cos() * 5.0).clamp(5.0, 85.0);
    let memory_percent = (20.0 + (t * 0.05).sin() * 15.0 + (t * 0.2).cos() * 8.0).clamp(10.0, 90.0);
    let disk_percent = (8.0 + (t * 0.01).sin() * 3.0 + (t * 0.1).cos() * 2.0).clamp(5.0, 95.0);

    let cpu_capacity_cores = 2.0;
    let memory_capacity_bytes: u64 = 8 * 1024 * 1024 * 1024;
    let disk_capacity_bytes = 50.0 * 1024.0 * 1024.0 * 1024.0;

    MetricsSample {
        timestamp: now,
        cpu_usage_cores: cpu_percent / 100.0 * cpu_capacity_cores,
        cpu_capacity_cores,
        memory_usage_bytes: (memory_percent / 100.0 * memory_capacity_bytes as f64) as u64,
        memory_capacity_bytes,
        disk_usage_bytes: Some((disk_percent / 100.0 * disk_capacity_bytes) as u64),
    }
}
