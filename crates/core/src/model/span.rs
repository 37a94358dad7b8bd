use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored span row as the engine holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    pub service_name: String,
    pub duration_ms: f64,
    pub is_error: bool,
}

/// The slice of a span the aggregators need, stamped with its trace's start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanSample {
    pub service_name: String,
    pub duration_ms: f64,
    pub is_error: bool,
    pub trace_start: DateTime<Utc>,
}
