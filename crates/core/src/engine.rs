//! Boundary to the tabular query engine.
//!
//! Statements carry SQL text with positional `?` placeholders and a typed
//! parameter list. Values supplied by callers (service names, trace ids,
//! window bounds) are always bound, never spliced into the SQL text.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{Result, SpanwatchError};

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub label: &'static str,
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    pub fn new(label: &'static str, sql: impl Into<String>) -> Self {
        Self {
            label,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn bind_text(self, value: impl Into<String>) -> Self {
        self.bind(Param::Text(value.into()))
    }

    pub fn bind_ts(self, value: DateTime<Utc>) -> Self {
        self.bind(Param::Timestamp(value))
    }

    pub fn bind_int(self, value: i64) -> Self {
        self.bind(Param::Int(value))
    }
}

/// Executes read-only statements. Implementations map any engine failure,
/// including a statement that did not complete, to `UpstreamQuery`.
pub trait QueryEngine: Clone + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn execute(&self, stmt: Statement) -> impl Future<Output = Result<Vec<Row>>> + Send;
}

/// One result row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    fn required(&self, column: &str) -> Result<&Value> {
        match self.0.get(column) {
            Some(Value::Null) | None => Err(shape_error(column, "missing or null")),
            Some(v) => Ok(v),
        }
    }

    pub fn str(&self, column: &str) -> Result<String> {
        match self.required(column)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(shape_error(column, &format!("expected text, got {other}"))),
        }
    }

    pub fn f64(&self, column: &str) -> Result<f64> {
        match self.required(column)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| shape_error(column, "number out of range")),
            Value::String(s) => s
                .parse::<f64>()
                .map_err(|e| shape_error(column, &format!("bad float {s:?}: {e}"))),
            other => Err(shape_error(column, &format!("expected number, got {other}"))),
        }
    }

    pub fn i64(&self, column: &str) -> Result<i64> {
        match self.required(column)? {
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(v), _) => Ok(v),
                // Whole-valued doubles (e.g. a SUM over integers) are accepted;
                // anything with a fractional part is a shape mismatch.
                (None, Some(f))
                    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
                {
                    Ok(f as i64)
                }
                (None, Some(f)) => Err(shape_error(column, &format!("expected integer, got {f}"))),
                (None, None) => Err(shape_error(column, "number out of range")),
            },
            Value::String(s) => s
                .parse::<i64>()
                .map_err(|e| shape_error(column, &format!("bad integer {s:?}: {e}"))),
            other => Err(shape_error(column, &format!("expected integer, got {other}"))),
        }
    }

    pub fn bool(&self, column: &str) -> Result<bool> {
        match self.required(column)? {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
            Value::String(s) => match s.as_str() {
                "true" | "TRUE" | "1" => Ok(true),
                "false" | "FALSE" | "0" => Ok(false),
                _ => Err(shape_error(column, &format!("bad boolean {s:?}"))),
            },
            other => Err(shape_error(column, &format!("expected boolean, got {other}"))),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
        let raw = self.str(column)?;
        parse_timestamp(&raw).ok_or_else(|| shape_error(column, &format!("bad timestamp {raw:?}")))
    }

    /// Text list column; a null list reads as empty.
    pub fn str_list(&self, column: &str) -> Result<Vec<String>> {
        match self.0.get(column) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(shape_error(column, &format!("expected text item, got {other}"))),
                })
                .collect(),
            Some(other) => Err(shape_error(column, &format!("expected list, got {other}"))),
        }
    }
}

/// Renders a timestamp the way statements bind it: naive UTC with microseconds.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

fn shape_error(column: &str, detail: &str) -> SpanwatchError {
    SpanwatchError::UpstreamQuery(format!("unexpected value in column {column}: {detail}"))
}
