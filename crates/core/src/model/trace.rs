use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceRecord {
    pub trace_id: String,
    pub trace_start: DateTime<Utc>,
    pub total_duration_ms: f64,
    pub span_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceInfo {
    pub trace_id: String,
    pub trace_start: DateTime<Utc>,
    pub services_involved: Vec<String>,
    pub total_duration_ms: f64,
    pub span_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSpanTotal {
    pub service_name: String,
    pub total_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceDetail {
    pub trace_id: String,
    pub trace_start: DateTime<Utc>,
    pub spans: Vec<ServiceSpanTotal>,
}
