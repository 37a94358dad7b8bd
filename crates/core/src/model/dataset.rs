use serde::{Deserialize, Serialize};

use crate::error::{Result, SpanwatchError};
use crate::ids::validate_service_name;
use crate::model::dependency::DependencyEdge;
use crate::model::span::SpanRecord;
use crate::model::trace::TraceRecord;

/// A batch of rows for the three tables, as read from a dataset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(default)]
    pub traces: Vec<TraceRecord>,
    #[serde(default)]
    pub spans: Vec<SpanRecord>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty() && self.spans.is_empty() && self.dependencies.is_empty()
    }

    /// Rejects rows that would break the aggregators: negative or non-finite
    /// durations, negative counts, blank identifiers, and service names no
    /// request could name.
    pub fn validate(&self) -> Result<()> {
        for trace in &self.traces {
            if trace.trace_id.trim().is_empty() {
                return Err(invalid("trace with empty trace_id"));
            }
            if !trace.total_duration_ms.is_finite() || trace.total_duration_ms < 0.0 {
                return Err(invalid(&format!(
                    "trace {} has invalid total_duration_ms {}",
                    trace.trace_id, trace.total_duration_ms
                )));
            }
            if trace.span_count < 0 {
                return Err(invalid(&format!(
                    "trace {} has negative span_count",
                    trace.trace_id
                )));
            }
        }

        for span in &self.spans {
            if span.trace_id.trim().is_empty() || span.span_id.trim().is_empty() {
                return Err(invalid("span with empty trace_id or span_id"));
            }
            validate_service_name(&span.service_name)
                .map_err(|e| invalid(&format!("span {}: {e}", span.span_id)))?;
            if !span.duration_ms.is_finite() || span.duration_ms < 0.0 {
                return Err(invalid(&format!(
                    "span {} has invalid duration_ms {}",
                    span.span_id, span.duration_ms
                )));
            }
        }

        for edge in &self.dependencies {
            for name in [&edge.source_service, &edge.target_service] {
                validate_service_name(name).map_err(|e| invalid(&format!("dependency: {e}")))?;
            }
            if edge.call_count < 0 {
                return Err(invalid(&format!(
                    "dependency {} -> {} has negative call_count",
                    edge.source_service, edge.target_service
                )));
            }
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> SpanwatchError {
    SpanwatchError::InvalidArgument(format!("dataset: {msg}"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn span(duration_ms: f64) -> SpanRecord {
        SpanRecord {
            trace_id: "t1".into(),
            span_id: "s1".into(),
            service_name: "api".into(),
            duration_ms,
            is_error: false,
        }
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let dataset: Dataset = serde_json::from_str(r#"{"dependencies": []}"#).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn rejects_negative_duration_and_count() {
        let dataset = Dataset {
            spans: vec![span(-1.0)],
            ..Dataset::default()
        };
        let err = dataset.validate().unwrap_err();
        assert!(matches!(err, SpanwatchError::InvalidArgument(_)));

        let dataset = Dataset {
            dependencies: vec![DependencyEdge::new("a", "b", -3)],
            ..Dataset::default()
        };
        assert!(dataset.validate().is_err());

        let dataset = Dataset {
            spans: vec![span(f64::NAN)],
            ..Dataset::default()
        };
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn rejects_service_names_requests_cannot_reach() {
        let mut padded = span(1.0);
        padded.service_name = " api".into();
        let dataset = Dataset {
            spans: vec![padded],
            ..Dataset::default()
        };
        let err = dataset.validate().unwrap_err();
        assert!(err.to_string().contains("whitespace"), "{err}");

        let dataset = Dataset {
            dependencies: vec![DependencyEdge::new("a", "b ", 1)],
            ..Dataset::default()
        };
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_rows() {
        let dataset = Dataset {
            traces: vec![TraceRecord {
                trace_id: "t1".into(),
                trace_start: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
                total_duration_ms: 12.0,
                span_count: 1,
            }],
            spans: vec![span(0.0)],
            dependencies: vec![DependencyEdge::new("a", "b", 0)],
        };
        assert!(dataset.validate().is_ok());
    }
}
