use duckdb::params;
use spanwatch_core::engine::format_timestamp;
use spanwatch_core::error::{Result, SpanwatchError};
use spanwatch_core::model::dependency::DependencyEdge;
use spanwatch_core::model::span::SpanRecord;
use spanwatch_core::model::trace::TraceRecord;

use crate::Store;

impl Store {
    pub fn insert_traces(&self, traces: &[TraceRecord]) -> Result<()> {
        if traces.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| SpanwatchError::Store(format!("begin tx failed: {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO traces (trace_id, trace_start, total_duration_ms, span_count)
                     VALUES (?, CAST(? AS TIMESTAMP), ?, ?)",
                )
                .map_err(|e| SpanwatchError::Store(format!("prepare insert traces failed: {e}")))?;

            for trace in traces {
                stmt.execute(params![
                    trace.trace_id,
                    format_timestamp(trace.trace_start),
                    trace.total_duration_ms,
                    trace.span_count,
                ])
                .map_err(|e| SpanwatchError::Store(format!("insert trace failed: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| SpanwatchError::Store(format!("commit traces failed: {e}")))
    }

    pub fn insert_spans(&self, spans: &[SpanRecord]) -> Result<()> {
        if spans.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| SpanwatchError::Store(format!("begin tx failed: {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO spans (trace_id, span_id, service_name, duration_ms, is_error)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .map_err(|e| SpanwatchError::Store(format!("prepare insert spans failed: {e}")))?;

            for span in spans {
                stmt.execute(params![
                    span.trace_id,
                    span.span_id,
                    span.service_name,
                    span.duration_ms,
                    span.is_error,
                ])
                .map_err(|e| SpanwatchError::Store(format!("insert span failed: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| SpanwatchError::Store(format!("commit spans failed: {e}")))
    }

    /// Appends rows to the call table; table order is insertion order.
    pub fn insert_dependencies(&self, edges: &[DependencyEdge]) -> Result<()> {
        self.write_dependencies(edges, false)
    }

    /// Swaps the whole call table for `edges`.
    pub fn replace_dependencies(&self, edges: &[DependencyEdge]) -> Result<()> {
        self.write_dependencies(edges, true)
    }

    fn write_dependencies(&self, edges: &[DependencyEdge], replace: bool) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| SpanwatchError::Store(format!("begin tx failed: {e}")))?;

        if replace {
            tx.execute("DELETE FROM service_dependencies", [])
                .map_err(|e| SpanwatchError::Store(format!("clear dependencies failed: {e}")))?;
        }

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO service_dependencies (position, source_service, target_service, call_count)
                     VALUES (nextval('dependency_position_seq'), ?, ?, ?)",
                )
                .map_err(|e| {
                    SpanwatchError::Store(format!("prepare insert dependencies failed: {e}"))
                })?;

            for edge in edges {
                stmt.execute(params![
                    edge.source_service,
                    edge.target_service,
                    edge.call_count,
                ])
                .map_err(|e| SpanwatchError::Store(format!("insert dependency failed: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| SpanwatchError::Store(format!("commit dependencies failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use spanwatch_core::model::dependency::DependencyEdge;

    use crate::Store;
    use crate::statements;

    #[test]
    fn replace_dependencies_swaps_table() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_dependencies(&[
                DependencyEdge::new("a", "b", 1),
                DependencyEdge::new("b", "c", 2),
            ])
            .unwrap();
        store
            .replace_dependencies(&[DependencyEdge::new("x", "y", 9)])
            .unwrap();

        let rows = store
            .execute_blocking(&statements::dependency_edges())
            .unwrap();
        let edges = statements::decode_edges(&rows).unwrap();
        assert_eq!(edges, vec![DependencyEdge::new("x", "y", 9)]);
    }

    #[test]
    fn reinserting_a_trace_replaces_it() {
        let store = Store::open_in_memory().unwrap();
        let start = chrono::Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let mut trace = spanwatch_core::model::trace::TraceRecord {
            trace_id: "t1".into(),
            trace_start: start,
            total_duration_ms: 10.0,
            span_count: 1,
        };
        store.insert_traces(&[trace.clone()]).unwrap();
        trace.total_duration_ms = 25.0;
        store.insert_traces(&[trace]).unwrap();

        let rows = store
            .execute_blocking(&statements::trace_by_id("t1"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp("trace_start").unwrap(), start);
    }
}
