use serde::Serialize;
use spanwatch::{ServiceDetail, StoreStatus};
use spanwatch_core::graph::{DependencyGraph, ServiceDependencies};
use spanwatch_core::health::ServiceHealth;
use spanwatch_core::model::trace::{TraceDetail, TraceInfo};
use spanwatch_core::time::TimeRange;

/// One query the CLI can send to a running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Services(TimeRange),
    Service(String, TimeRange),
    Dependencies(String),
    Graph(TimeRange),
    Traces(TimeRange, Option<String>),
    Trace(String),
    Status,
}

impl ApiRequest {
    /// Path segments under the server root; each one is percent-encoded by
    /// the client, so service names and trace ids pass through untouched.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Services(_) => vec!["api", "services", "list"],
            Self::Service(name, _) => vec!["api", "services", name.as_str(), "metrics"],
            Self::Dependencies(name) => vec!["api", "services", name.as_str(), "dependencies"],
            Self::Graph(_) => vec!["api", "dependencies", "graph"],
            Self::Traces(_, Some(name)) => vec!["api", "services", name.as_str(), "traces"],
            Self::Traces(_, None) => vec!["api", "traces"],
            Self::Trace(id) => vec!["api", "traces", id.as_str()],
            Self::Status => vec!["api", "store", "info"],
        }
    }

    pub fn time_range(&self) -> Option<TimeRange> {
        match self {
            Self::Services(r) | Self::Service(_, r) | Self::Graph(r) | Self::Traces(r, _) => {
                Some(*r)
            }
            Self::Dependencies(_) | Self::Trace(_) | Self::Status => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Services(Vec<ServiceHealth>),
    Service(ServiceDetail),
    Dependencies(ServiceDependencies),
    Graph(DependencyGraph),
    Traces(Vec<TraceInfo>),
    Trace(TraceDetail),
    Status(StoreStatus),
}
