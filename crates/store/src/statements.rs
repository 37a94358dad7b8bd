//! DuckDB statements for every fetch the service issues, and the decoders
//! that turn their rows back into typed records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spanwatch_core::engine::{Row, Statement};
use spanwatch_core::error::Result;
use spanwatch_core::model::dependency::DependencyEdge;
use spanwatch_core::model::span::SpanSample;
use spanwatch_core::model::trace::{ServiceSpanTotal, TraceInfo};
use spanwatch_core::time::Window;

const WINDOW_SPANS_SQL: &str = "SELECT s.service_name, s.duration_ms, s.is_error, t.trace_start
     FROM spans s
     JOIN traces t ON t.trace_id = s.trace_id
     WHERE t.trace_start >= CAST(? AS TIMESTAMP)
       AND t.trace_start < CAST(? AS TIMESTAMP)";

/// Spans whose trace started inside `window`, optionally for one service.
pub fn window_spans(window: &Window, service: Option<&str>) -> Statement {
    match service {
        Some(service) => Statement::new(
            "window_spans_for_service",
            format!("{WINDOW_SPANS_SQL}\n       AND s.service_name = ?"),
        )
        .bind_ts(window.start)
        .bind_ts(window.end)
        .bind_text(service),
        None => Statement::new("window_spans", WINDOW_SPANS_SQL)
            .bind_ts(window.start)
            .bind_ts(window.end),
    }
}

pub fn dependency_edges() -> Statement {
    Statement::new(
        "dependency_edges",
        "SELECT source_service, target_service, call_count
         FROM service_dependencies
         ORDER BY position",
    )
}

/// Edges touching `service` on either side.
pub fn dependency_edges_for(service: &str) -> Statement {
    Statement::new(
        "dependency_edges_for_service",
        "SELECT source_service, target_service, call_count
         FROM service_dependencies
         WHERE source_service = ? OR target_service = ?
         ORDER BY position",
    )
    .bind_text(service)
    .bind_text(service)
}

/// Most recent traces in `window`, newest first.
pub fn recent_traces(window: &Window, service: Option<&str>, limit: usize) -> Statement {
    let service_filter = if service.is_some() {
        "\n       AND EXISTS (
         SELECT 1 FROM spans sf WHERE sf.trace_id = t.trace_id AND sf.service_name = ?
       )"
    } else {
        ""
    };
    let sql = format!(
        "SELECT t.trace_id, t.trace_start, t.total_duration_ms, t.span_count,
            (SELECT list_sort(list_distinct(list(s.service_name)))
             FROM spans s WHERE s.trace_id = t.trace_id) AS services_involved
     FROM traces t
     WHERE t.trace_start >= CAST(? AS TIMESTAMP)
       AND t.trace_start < CAST(? AS TIMESTAMP){service_filter}
     ORDER BY t.trace_start DESC, t.trace_id
     LIMIT ?"
    );

    let stmt = Statement::new("recent_traces", sql)
        .bind_ts(window.start)
        .bind_ts(window.end);
    let stmt = match service {
        Some(service) => stmt.bind_text(service),
        None => stmt,
    };
    stmt.bind_int(i64::try_from(limit).unwrap_or(i64::MAX))
}

pub fn trace_by_id(trace_id: &str) -> Statement {
    Statement::new(
        "trace_by_id",
        "SELECT trace_id, trace_start FROM traces WHERE trace_id = ? LIMIT 1",
    )
    .bind_text(trace_id)
}

/// Summed span duration per service within one trace, largest first.
pub fn trace_service_totals(trace_id: &str) -> Statement {
    Statement::new(
        "trace_service_totals",
        "SELECT service_name, CAST(SUM(duration_ms) AS DOUBLE) AS total_duration_ms
         FROM spans
         WHERE trace_id = ?
         GROUP BY service_name
         ORDER BY total_duration_ms DESC, service_name",
    )
    .bind_text(trace_id)
}

pub fn store_counts() -> Statement {
    Statement::new(
        "store_counts",
        "SELECT
            (SELECT COUNT(*) FROM traces) AS traces,
            (SELECT COUNT(*) FROM spans) AS spans,
            (SELECT COUNT(*) FROM service_dependencies) AS dependencies,
            (SELECT MIN(trace_start) FROM traces) AS oldest_trace,
            (SELECT MAX(trace_start) FROM traces) AS newest_trace",
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreCounts {
    pub traces: i64,
    pub spans: i64,
    pub dependencies: i64,
    pub oldest_trace: Option<DateTime<Utc>>,
    pub newest_trace: Option<DateTime<Utc>>,
}

pub fn decode_spans(rows: &[Row]) -> Result<Vec<SpanSample>> {
    rows.iter()
        .map(|row| {
            Ok(SpanSample {
                service_name: row.str("service_name")?,
                duration_ms: row.f64("duration_ms")?,
                is_error: row.bool("is_error")?,
                trace_start: row.timestamp("trace_start")?,
            })
        })
        .collect()
}

pub fn decode_edges(rows: &[Row]) -> Result<Vec<DependencyEdge>> {
    rows.iter()
        .map(|row| {
            Ok(DependencyEdge {
                source_service: row.str("source_service")?,
                target_service: row.str("target_service")?,
                call_count: row.i64("call_count")?,
            })
        })
        .collect()
}

pub fn decode_traces(rows: &[Row]) -> Result<Vec<TraceInfo>> {
    rows.iter()
        .map(|row| {
            Ok(TraceInfo {
                trace_id: row.str("trace_id")?,
                trace_start: row.timestamp("trace_start")?,
                services_involved: row.str_list("services_involved")?,
                total_duration_ms: row.f64("total_duration_ms")?,
                span_count: row.i64("span_count")?,
            })
        })
        .collect()
}

pub fn decode_service_totals(rows: &[Row]) -> Result<Vec<ServiceSpanTotal>> {
    rows.iter()
        .map(|row| {
            Ok(ServiceSpanTotal {
                service_name: row.str("service_name")?,
                total_duration_ms: row.f64("total_duration_ms")?,
            })
        })
        .collect()
}

pub fn decode_counts(row: &Row) -> Result<StoreCounts> {
    let optional_ts = |column: &str| match row.get(column) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => row.timestamp(column).map(Some),
    };
    Ok(StoreCounts {
        traces: row.i64("traces")?,
        spans: row.i64("spans")?,
        dependencies: row.i64("dependencies")?,
        oldest_trace: optional_ts("oldest_trace")?,
        newest_trace: optional_ts("newest_trace")?,
    })
}
