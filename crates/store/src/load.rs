use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use spanwatch_core::error::{Result, SpanwatchError};
use spanwatch_core::model::dataset::Dataset;

use crate::Store;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetSummary {
    pub traces: usize,
    pub spans: usize,
    pub dependencies: usize,
}

impl DatasetSummary {
    /// Rows the load leaves in the store. Traces and spans are upserted by
    /// id, so repeated ids within one dataset count once.
    fn of(dataset: &Dataset) -> Self {
        let traces: BTreeSet<&str> = dataset
            .traces
            .iter()
            .map(|t| t.trace_id.as_str())
            .collect();
        let spans: BTreeSet<(&str, &str)> = dataset
            .spans
            .iter()
            .map(|s| (s.trace_id.as_str(), s.span_id.as_str()))
            .collect();
        Self {
            traces: traces.len(),
            spans: spans.len(),
            dependencies: dataset.dependencies.len(),
        }
    }
}

impl Store {
    /// Upserts traces and spans. A non-empty dependency list replaces the
    /// call table wholesale; an empty one leaves it untouched.
    pub fn load(&self, dataset: &Dataset) -> Result<DatasetSummary> {
        dataset.validate()?;
        if dataset.is_empty() {
            tracing::warn!("dataset has no traces, spans or dependencies");
        }

        self.insert_traces(&dataset.traces)?;
        self.insert_spans(&dataset.spans)?;
        if !dataset.dependencies.is_empty() {
            self.replace_dependencies(&dataset.dependencies)?;
        }

        let summary = DatasetSummary::of(dataset);
        tracing::info!(
            traces = summary.traces,
            spans = summary.spans,
            dependencies = summary.dependencies,
            "dataset loaded"
        );
        Ok(summary)
    }

    pub fn load_dataset(&self, path: &Path) -> Result<DatasetSummary> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SpanwatchError::Io(format!("failed to read dataset {}: {e}", path.display()))
        })?;
        let dataset: Dataset = serde_json::from_str(&raw).map_err(|e| {
            SpanwatchError::InvalidArgument(format!("invalid dataset {}: {e}", path.display()))
        })?;
        self.load(&dataset)
    }
}
