use serde::{Deserialize, Serialize};

/// One row of the static service-to-service call table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyEdge {
    pub source_service: String,
    pub target_service: String,
    pub call_count: i64,
}

impl DependencyEdge {
    pub fn new(source: &str, target: &str, call_count: i64) -> Self {
        Self {
            source_service: source.to_string(),
            target_service: target.to_string(),
            call_count,
        }
    }
}
