use std::future::Future;

use duckdb::params_from_iter;
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde_json::Value;
use spanwatch_core::engine::{Param, QueryEngine, Row, Statement, format_timestamp};
use spanwatch_core::error::{Result, SpanwatchError};

use crate::Store;

impl QueryEngine for Store {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn execute(&self, stmt: Statement) -> impl Future<Output = Result<Vec<Row>>> + Send {
        let store = self.clone();
        async move {
            tokio::task::spawn_blocking(move || store.execute_blocking(&stmt))
                .await
                .map_err(|e| SpanwatchError::Internal(format!("query task join failed: {e}")))?
        }
    }
}

impl Store {
    pub fn execute_blocking(&self, stmt: &Statement) -> Result<Vec<Row>> {
        let conn = self.conn();
        let mut prepared = conn.prepare(&stmt.sql).map_err(|e| {
            SpanwatchError::UpstreamQuery(format!("prepare {} failed: {e}", stmt.label))
        })?;

        let params = stmt.params.iter().map(to_duck).collect::<Vec<_>>();
        let mut rows = prepared.query(params_from_iter(params)).map_err(|e| {
            SpanwatchError::UpstreamQuery(format!("execute {} failed: {e}", stmt.label))
        })?;
        let columns = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| {
            SpanwatchError::UpstreamQuery(format!("read {} row failed: {e}", stmt.label))
        })? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row.get::<_, DuckValue>(idx).map_err(|e| {
                    SpanwatchError::UpstreamQuery(format!(
                        "read {} column {name} failed: {e}",
                        stmt.label
                    ))
                })?;
                record.insert(name, to_json(value));
            }
            out.push(record);
        }

        tracing::debug!(statement = stmt.label, rows = out.len(), "duckdb statement done");
        Ok(out)
    }
}

fn to_duck(param: &Param) -> DuckValue {
    match param {
        Param::Text(v) => DuckValue::Text(v.clone()),
        Param::Int(v) => DuckValue::BigInt(*v),
        Param::Timestamp(v) => DuckValue::Text(format_timestamp(*v)),
    }
}

fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(v) => Value::Bool(v),
        DuckValue::TinyInt(v) => Value::from(v),
        DuckValue::SmallInt(v) => Value::from(v),
        DuckValue::Int(v) => Value::from(v),
        DuckValue::BigInt(v) => Value::from(v),
        DuckValue::HugeInt(v) => i64::try_from(v)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(v.to_string())),
        DuckValue::UTinyInt(v) => Value::from(v),
        DuckValue::USmallInt(v) => Value::from(v),
        DuckValue::UInt(v) => Value::from(v),
        DuckValue::UBigInt(v) => Value::from(v),
        DuckValue::Float(v) => float_json(f64::from(v)),
        DuckValue::Double(v) => float_json(v),
        DuckValue::Text(v) => Value::String(v),
        DuckValue::Enum(v) => Value::String(v),
        DuckValue::Timestamp(unit, v) => timestamp_json(unit, v),
        DuckValue::List(items) => Value::Array(items.into_iter().map(to_json).collect()),
        other => Value::String(format!("{other:?}")),
    }
}

fn float_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn timestamp_json(unit: TimeUnit, v: i64) -> Value {
    let micros = match unit {
        TimeUnit::Second => v.saturating_mul(1_000_000),
        TimeUnit::Millisecond => v.saturating_mul(1_000),
        TimeUnit::Microsecond => v,
        TimeUnit::Nanosecond => v / 1_000,
    };
    chrono::DateTime::from_timestamp_micros(micros)
        .map(|ts| Value::String(format_timestamp(ts)))
        .unwrap_or(Value::Null)
}
