use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpanwatchError};
use crate::stats::MetricsSnapshot;

pub const CRITICAL_ERROR_RATE: f64 = 0.05;
pub const WARNING_ERROR_RATE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of a dependency neighbour. `Unknown` when the neighbour produced no
/// spans in the evaluation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborHealth {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl From<HealthStatus> for NeighborHealth {
    fn from(value: HealthStatus) -> Self {
        match value {
            HealthStatus::Healthy => Self::Healthy,
            HealthStatus::Warning => Self::Warning,
            HealthStatus::Critical => Self::Critical,
        }
    }
}

impl From<Option<HealthStatus>> for NeighborHealth {
    fn from(value: Option<HealthStatus>) -> Self {
        value.map_or(Self::Unknown, Self::from)
    }
}

impl fmt::Display for NeighborHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        })
    }
}

/// How a verdict is derived. One policy is configured per process and used by
/// every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthPolicy {
    /// Absolute error-rate thresholds; the baseline is ignored.
    Threshold,
    /// Latency and throughput compared against the preceding window.
    #[default]
    Baseline,
}

impl HealthPolicy {
    pub fn needs_baseline(self) -> bool {
        matches!(self, Self::Baseline)
    }

    pub fn classify(
        self,
        current: &MetricsSnapshot,
        baseline: Option<&MetricsSnapshot>,
    ) -> HealthStatus {
        match self {
            Self::Threshold => classify_threshold(current),
            Self::Baseline => classify_baseline(current, baseline),
        }
    }
}

impl FromStr for HealthPolicy {
    type Err = SpanwatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "threshold" | "absolute" => Ok(Self::Threshold),
            "baseline" | "relative" => Ok(Self::Baseline),
            other => Err(SpanwatchError::InvalidArgument(format!(
                "unknown health policy: {other}"
            ))),
        }
    }
}

/// A service's current snapshot with its verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceHealth {
    pub service_name: String,
    pub health_status: HealthStatus,
    pub current: MetricsSnapshot,
}

/// Classifies every service present in `current`. Services seen only in the
/// baseline window are dropped: they have no current behaviour to judge.
pub fn assess_services(
    policy: HealthPolicy,
    current: BTreeMap<String, MetricsSnapshot>,
    baseline: &BTreeMap<String, MetricsSnapshot>,
) -> Vec<ServiceHealth> {
    current
        .into_iter()
        .map(|(service_name, snapshot)| {
            let health_status = policy.classify(&snapshot, baseline.get(&service_name));
            ServiceHealth {
                service_name,
                health_status,
                current: snapshot,
            }
        })
        .collect()
}

fn classify_threshold(current: &MetricsSnapshot) -> HealthStatus {
    if current.error_rate > CRITICAL_ERROR_RATE {
        HealthStatus::Critical
    } else if current.error_rate > WARNING_ERROR_RATE {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

fn classify_baseline(current: &MetricsSnapshot, baseline: Option<&MetricsSnapshot>) -> HealthStatus {
    // A missing baseline compares the current window against itself.
    let baseline = baseline.unwrap_or(current);
    if current.latency_p50 > baseline.latency_p50 {
        HealthStatus::Critical
    } else if current.requests_per_second > baseline.requests_per_second {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}
