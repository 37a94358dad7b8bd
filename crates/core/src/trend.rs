use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::span::SpanSample;
use crate::stats::{percentile_cont, sort_durations};
use crate::time::truncate_to_minute;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub latency_p95: f64,
    pub avg_duration_ms: f64,
    pub error_count: i64,
    pub request_count: i64,
}

/// Buckets spans by the minute their trace started. Only non-empty buckets
/// are emitted, ascending by timestamp.
pub fn build_trend<'a, I>(spans: I) -> Vec<TrendPoint>
where
    I: IntoIterator<Item = &'a SpanSample>,
{
    let mut buckets: BTreeMap<DateTime<Utc>, (Vec<f64>, i64)> = BTreeMap::new();
    for span in spans {
        let (durations, errors) = buckets
            .entry(truncate_to_minute(span.trace_start))
            .or_default();
        durations.push(span.duration_ms);
        if span.is_error {
            *errors += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(timestamp, (mut durations, error_count))| {
            sort_durations(&mut durations);
            let request_count = durations.len() as i64;
            TrendPoint {
                timestamp,
                latency_p95: percentile_cont(&durations, 0.95),
                avg_duration_ms: durations.iter().sum::<f64>() / request_count as f64,
                error_count,
                request_count,
            }
        })
        .collect()
}
