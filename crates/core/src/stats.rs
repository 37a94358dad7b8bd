use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::span::SpanSample;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub latency_p50: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: f64,
    pub error_count: i64,
    pub error_rate: f64,
    pub request_count: i64,
    pub requests_per_second: f64,
}

impl MetricsSnapshot {
    /// Aggregates a bag of spans already restricted to one window.
    ///
    /// Returns `None` for an empty bag: percentiles, mean and max have no
    /// value there and callers must treat that as "no data".
    pub fn from_spans<'a, I>(spans: I, window_seconds: i64) -> Option<Self>
    where
        I: IntoIterator<Item = &'a SpanSample>,
    {
        let mut durations = Vec::new();
        let mut error_count = 0i64;
        for span in spans {
            durations.push(span.duration_ms);
            if span.is_error {
                error_count += 1;
            }
        }
        if durations.is_empty() {
            return None;
        }
        sort_durations(&mut durations);

        let request_count = durations.len() as i64;
        let sum: f64 = durations.iter().sum();
        Some(Self {
            latency_p50: percentile_cont(&durations, 0.50),
            latency_p95: percentile_cont(&durations, 0.95),
            latency_p99: percentile_cont(&durations, 0.99),
            avg_duration_ms: sum / request_count as f64,
            max_duration_ms: durations[durations.len() - 1],
            error_count,
            error_rate: error_rate(error_count, request_count),
            request_count,
            requests_per_second: requests_per_second(request_count, window_seconds),
        })
    }
}

pub fn error_rate(error_count: i64, request_count: i64) -> f64 {
    if request_count == 0 {
        return 0.0;
    }
    error_count as f64 / request_count as f64
}

pub fn requests_per_second(request_count: i64, window_seconds: i64) -> f64 {
    if window_seconds <= 0 {
        return 0.0;
    }
    request_count as f64 / window_seconds as f64
}

/// Continuous percentile over ascending `sorted`, interpolating linearly
/// between the order statistics around rank `(n - 1) * pct`.
pub fn percentile_cont(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() - 1) as f64 * pct.clamp(0.0, 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let lo = sorted[lower];
    let hi = sorted[upper.min(sorted.len() - 1)];
    lo + (rank - lower as f64) * (hi - lo)
}

pub(crate) fn sort_durations(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

/// Partitions a mixed bag by service name.
pub fn group_by_service(spans: &[SpanSample]) -> BTreeMap<&str, Vec<&SpanSample>> {
    let mut groups: BTreeMap<&str, Vec<&SpanSample>> = BTreeMap::new();
    for span in spans {
        groups
            .entry(span.service_name.as_str())
            .or_default()
            .push(span);
    }
    groups
}

/// One snapshot per service that has at least one span in the bag.
pub fn snapshots_by_service(
    spans: &[SpanSample],
    window_seconds: i64,
) -> BTreeMap<String, MetricsSnapshot> {
    group_by_service(spans)
        .into_iter()
        .filter_map(|(service, bag)| {
            MetricsSnapshot::from_spans(bag, window_seconds)
                .map(|snapshot| (service.to_string(), snapshot))
        })
        .collect()
}
