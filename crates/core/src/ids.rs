use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpanwatchError};

const MAX_SERVICE_NAME_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceName(String);

fn trace_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._:\-]{1,128}$").expect("valid trace id regex"))
}

impl TraceId {
    pub fn parse(input: &str) -> Result<Self> {
        if !trace_id_pattern().is_match(input) {
            return Err(SpanwatchError::InvalidArgument(format!(
                "invalid trace id: {input:?}"
            )));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ServiceName {
    /// Accepts any non-blank name without surrounding whitespace; the value
    /// is only ever bound as a query parameter so quotes and other
    /// punctuation are allowed.
    pub fn parse(input: &str) -> Result<Self> {
        validate_service_name(input)?;
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shared by request parsing and dataset validation so every stored name is
/// also a name callers can ask for.
pub fn validate_service_name(input: &str) -> Result<()> {
    if input.trim().is_empty() {
        return Err(SpanwatchError::InvalidArgument(
            "service name cannot be empty".to_string(),
        ));
    }
    if input.trim() != input {
        return Err(SpanwatchError::InvalidArgument(format!(
            "service name has leading or trailing whitespace: {input:?}"
        )));
    }
    if input.len() > MAX_SERVICE_NAME_LEN {
        return Err(SpanwatchError::InvalidArgument(format!(
            "service name longer than {MAX_SERVICE_NAME_LEN} bytes"
        )));
    }
    Ok(())
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
