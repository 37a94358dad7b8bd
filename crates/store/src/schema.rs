pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS traces (
  trace_id TEXT PRIMARY KEY,
  trace_start TIMESTAMP NOT NULL,
  total_duration_ms DOUBLE NOT NULL,
  span_count BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS spans (
  trace_id TEXT NOT NULL,
  span_id TEXT NOT NULL,
  service_name TEXT NOT NULL,
  duration_ms DOUBLE NOT NULL,
  is_error BOOLEAN NOT NULL,
  PRIMARY KEY(trace_id, span_id)
);

CREATE TABLE IF NOT EXISTS service_dependencies (
  position BIGINT PRIMARY KEY,
  source_service TEXT NOT NULL,
  target_service TEXT NOT NULL,
  call_count BIGINT NOT NULL
);

CREATE SEQUENCE IF NOT EXISTS dependency_position_seq;

CREATE INDEX IF NOT EXISTS idx_traces_start ON traces(trace_start);
CREATE INDEX IF NOT EXISTS idx_spans_trace ON spans(trace_id);
CREATE INDEX IF NOT EXISTS idx_spans_service ON spans(service_name);
"#;
