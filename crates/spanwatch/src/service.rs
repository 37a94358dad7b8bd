//! The observability operations: each one fetches span and edge rows from the
//! engine, then reduces them with the pure aggregators in `spanwatch-core`.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spanwatch_core::config::Config;
use spanwatch_core::engine::{QueryEngine, Row, Statement};
use spanwatch_core::error::{Result, SpanwatchError};
use spanwatch_core::graph::{DependencyGraph, ServiceDependencies, build_graph, resolve_dependencies};
use spanwatch_core::health::{HealthPolicy, HealthStatus, ServiceHealth, assess_services};
use spanwatch_core::ids::{ServiceName, TraceId};
use spanwatch_core::model::dependency::DependencyEdge;
use spanwatch_core::model::span::SpanSample;
use spanwatch_core::model::trace::{TraceDetail, TraceInfo};
use spanwatch_core::stats::{MetricsSnapshot, snapshots_by_service};
use spanwatch_core::time::{TimeRange, Window};
use spanwatch_core::trend::{TrendPoint, build_trend};
use spanwatch_store::statements::{self, StoreCounts};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSettings {
    pub query_timeout: Duration,
    pub health_policy: HealthPolicy,
    pub trace_list_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServiceSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            query_timeout: cfg.query_timeout,
            health_policy: cfg.health_policy,
            trace_list_limit: cfg.trace_list_limit,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Clock {
    System,
    Fixed(DateTime<Utc>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceDetail {
    pub service_name: String,
    pub health_status: HealthStatus,
    pub current: MetricsSnapshot,
    pub trends: Vec<TrendPoint>,
    pub baseline: MetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreStatus {
    pub engine: String,
    #[serde(flatten)]
    pub counts: StoreCounts,
}

#[derive(Debug, Clone)]
pub struct Observability<E> {
    engine: E,
    settings: ServiceSettings,
    clock: Clock,
}

impl<E: QueryEngine> Observability<E> {
    pub fn new(engine: E, settings: ServiceSettings) -> Self {
        Self {
            engine,
            settings,
            clock: Clock::System,
        }
    }

    /// Pins "now" so windows are reproducible.
    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Clock::Fixed(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        match self.clock {
            Clock::System => Utc::now(),
            Clock::Fixed(now) => now,
        }
    }

    /// Every service with spans in the current window, busiest first.
    pub async fn list_services(&self, range: TimeRange) -> Result<Vec<ServiceHealth>> {
        let now = self.now();
        let mut services = self.assess_window(range, now).await?;
        services.sort_by(|a, b| {
            Reverse(a.current.request_count)
                .cmp(&Reverse(b.current.request_count))
                .then_with(|| a.service_name.cmp(&b.service_name))
        });
        tracing::info!(range = %range, services = services.len(), "listed services");
        Ok(services)
    }

    pub async fn service_detail(&self, service: &str, range: TimeRange) -> Result<ServiceDetail> {
        let service = ServiceName::parse(service)?;
        let now = self.now();
        let current_window = range.current(now);
        let baseline_window = range.baseline(now);

        let (current_spans, baseline_spans) = tokio::try_join!(
            self.window_spans(&current_window, Some(service.as_str())),
            self.window_spans(&baseline_window, Some(service.as_str())),
        )?;

        let Some(current) = MetricsSnapshot::from_spans(&current_spans, current_window.seconds)
        else {
            return Err(SpanwatchError::NotFound(format!(
                "no spans for service {service} in the last {range}"
            )));
        };
        let baseline = MetricsSnapshot::from_spans(&baseline_spans, baseline_window.seconds)
            .unwrap_or_else(|| current.clone());

        let health_status = self.settings.health_policy.classify(&current, Some(&baseline));
        let trends = build_trend(&current_spans);

        tracing::info!(
            service = %service,
            range = %range,
            spans = current_spans.len(),
            buckets = trends.len(),
            "built service detail"
        );
        Ok(ServiceDetail {
            service_name: service.to_string(),
            health_status,
            current,
            trends,
            baseline,
        })
    }

    pub async fn dependency_graph(&self, range: TimeRange) -> Result<DependencyGraph> {
        let now = self.now();
        let (edges, health) = tokio::try_join!(
            self.fetch_edges(statements::dependency_edges()),
            self.assess_window(range, now),
        )?;

        let graph = build_graph(&edges, &health);
        tracing::info!(
            range = %range,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "built dependency graph"
        );
        Ok(graph)
    }

    /// Neighbours of `service` in the call table. Health always compares the
    /// last hour against the hour before, whatever range the caller uses
    /// elsewhere.
    pub async fn service_dependencies(&self, service: &str) -> Result<ServiceDependencies> {
        let service = ServiceName::parse(service)?;
        let now = self.now();
        let (edges, health) = tokio::try_join!(
            self.fetch_edges(statements::dependency_edges_for(service.as_str())),
            self.assess_window(TimeRange::OneHour, now),
        )?;

        let verdicts: BTreeMap<String, HealthStatus> = health
            .into_iter()
            .map(|h| (h.service_name, h.health_status))
            .collect();
        let deps = resolve_dependencies(service.as_str(), &edges, &verdicts);
        tracing::info!(
            service = %service,
            inbound = deps.inbound.len(),
            outbound = deps.outbound.len(),
            "resolved dependencies"
        );
        Ok(deps)
    }

    pub async fn list_traces(
        &self,
        range: TimeRange,
        service: Option<&str>,
    ) -> Result<Vec<TraceInfo>> {
        let service = service.map(ServiceName::parse).transpose()?;
        let window = range.current(self.now());
        let stmt = statements::recent_traces(
            &window,
            service.as_ref().map(ServiceName::as_str),
            self.settings.trace_list_limit,
        );
        let traces = statements::decode_traces(&self.fetch(stmt).await?)?;
        tracing::info!(range = %range, traces = traces.len(), "listed traces");
        Ok(traces)
    }

    pub async fn trace_detail(&self, trace_id: &str) -> Result<TraceDetail> {
        let trace_id = TraceId::parse(trace_id)?;
        let (trace_rows, total_rows) = tokio::try_join!(
            self.fetch(statements::trace_by_id(trace_id.as_str())),
            self.fetch(statements::trace_service_totals(trace_id.as_str())),
        )?;

        let Some(trace) = trace_rows.first() else {
            return Err(SpanwatchError::NotFound(format!("trace {trace_id}")));
        };
        Ok(TraceDetail {
            trace_id: trace.str("trace_id")?,
            trace_start: trace.timestamp("trace_start")?,
            spans: statements::decode_service_totals(&total_rows)?,
        })
    }

    pub async fn store_status(&self) -> Result<StoreStatus> {
        let rows = self.fetch(statements::store_counts()).await?;
        let row = rows.first().ok_or_else(|| {
            SpanwatchError::UpstreamQuery("store_counts returned no rows".to_string())
        })?;
        Ok(StoreStatus {
            engine: self.engine.name().to_string(),
            counts: statements::decode_counts(row)?,
        })
    }

    /// Health for every service in the current window of `range`. The
    /// baseline window is only fetched when the policy reads it.
    async fn assess_window(&self, range: TimeRange, now: DateTime<Utc>) -> Result<Vec<ServiceHealth>> {
        let current_window = range.current(now);
        let baseline_window = range.baseline(now);

        let (current_spans, baseline_spans) = if self.settings.health_policy.needs_baseline() {
            tokio::try_join!(
                self.window_spans(&current_window, None),
                self.window_spans(&baseline_window, None),
            )?
        } else {
            (self.window_spans(&current_window, None).await?, Vec::new())
        };

        let current = snapshots_by_service(&current_spans, current_window.seconds);
        let baseline = snapshots_by_service(&baseline_spans, baseline_window.seconds);
        Ok(assess_services(self.settings.health_policy, current, &baseline))
    }

    async fn window_spans(&self, window: &Window, service: Option<&str>) -> Result<Vec<SpanSample>> {
        let rows = self.fetch(statements::window_spans(window, service)).await?;
        statements::decode_spans(&rows)
    }

    async fn fetch_edges(&self, stmt: Statement) -> Result<Vec<DependencyEdge>> {
        let rows = self.fetch(stmt).await?;
        statements::decode_edges(&rows)
    }

    /// Runs one statement under the configured timeout. An expired timeout is
    /// a query failure, never an empty result.
    async fn fetch(&self, stmt: Statement) -> Result<Vec<Row>> {
        let label = stmt.label;
        let timeout = self.settings.query_timeout;
        tracing::debug!(statement = label, engine = self.engine.name(), "query issued");

        match tokio::time::timeout(timeout, self.engine.execute(stmt)).await {
            Ok(Ok(rows)) => {
                tracing::debug!(statement = label, rows = rows.len(), "query returned");
                Ok(rows)
            }
            Ok(Err(err)) => {
                tracing::warn!(statement = label, error = %err, "query failed");
                Err(err)
            }
            Err(_) => {
                tracing::warn!(statement = label, timeout = ?timeout, "query timed out");
                Err(SpanwatchError::UpstreamQuery(format!(
                    "{label} timed out after {}",
                    humantime::format_duration(timeout)
                )))
            }
        }
    }
}
