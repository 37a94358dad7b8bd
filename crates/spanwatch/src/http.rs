use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use spanwatch_core::engine::QueryEngine;
use spanwatch_core::error::SpanwatchError;
use spanwatch_core::graph::{DependencyGraph, ServiceDependencies};
use spanwatch_core::health::ServiceHealth;
use spanwatch_core::model::trace::{TraceDetail, TraceInfo};
use spanwatch_core::time::TimeRange;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::service::{Observability, ServiceDetail, StoreStatus};

/// Error body shared by every route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug)]
pub struct ApiError(SpanwatchError);

impl From<SpanwatchError> for ApiError {
    fn from(err: SpanwatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            SpanwatchError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            SpanwatchError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SpanwatchError::UpstreamQuery(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream_query_failed")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }

        let body = ErrorResponse {
            error: error.to_string(),
            message: self.0.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub time_range: Option<String>,
}

impl RangeParams {
    fn range(&self) -> Result<TimeRange, ApiError> {
        Ok(TimeRange::parse_or_default(self.time_range.as_deref())?)
    }
}

pub fn router<E: QueryEngine>(service: Observability<E>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/services/list", get(list_services::<E>))
        .route("/api/services/{service_name}/metrics", get(service_metrics::<E>))
        .route(
            "/api/services/{service_name}/dependencies",
            get(service_dependencies::<E>),
        )
        .route("/api/services/{service_name}/traces", get(service_traces::<E>))
        .route("/api/traces", get(list_traces::<E>))
        .route("/api/traces/{trace_id}", get(trace_detail::<E>))
        .route("/api/dependencies/graph", get(dependency_graph::<E>))
        .route("/api/store/info", get(store_info::<E>))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        request_id = %uuid::Uuid::new_v4().simple(),
                        method = %req.method(),
                        uri = %req.uri(),
                    )
                })
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(service)
}

pub async fn serve<E: QueryEngine>(service: Observability<E>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind HTTP listener {addr}"))?;
    tracing::info!(%addr, "http api listening");
    axum::serve(listener, router(service))
        .await
        .context("http server failed")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_services<E: QueryEngine>(
    State(svc): State<Observability<E>>,
    Query(params): Query<RangeParams>,
) -> ApiResult<Vec<ServiceHealth>> {
    Ok(Json(svc.list_services(params.range()?).await?))
}

async fn service_metrics<E: QueryEngine>(
    State(svc): State<Observability<E>>,
    Path(service_name): Path<String>,
    Query(params): Query<RangeParams>,
) -> ApiResult<ServiceDetail> {
    Ok(Json(svc.service_detail(&service_name, params.range()?).await?))
}

async fn service_dependencies<E: QueryEngine>(
    State(svc): State<Observability<E>>,
    Path(service_name): Path<String>,
) -> ApiResult<ServiceDependencies> {
    Ok(Json(svc.service_dependencies(&service_name).await?))
}

async fn service_traces<E: QueryEngine>(
    State(svc): State<Observability<E>>,
    Path(service_name): Path<String>,
    Query(params): Query<RangeParams>,
) -> ApiResult<Vec<TraceInfo>> {
    Ok(Json(
        svc.list_traces(params.range()?, Some(&service_name)).await?,
    ))
}

async fn trace_detail<E: QueryEngine>(
    State(svc): State<Observability<E>>,
    Path(trace_id): Path<String>,
) -> ApiResult<TraceDetail> {
    Ok(Json(svc.trace_detail(&trace_id).await?))
}

async fn list_traces<E: QueryEngine>(
    State(svc): State<Observability<E>>,
    Query(params): Query<RangeParams>,
) -> ApiResult<Vec<TraceInfo>> {
    Ok(Json(svc.list_traces(params.range()?, None).await?))
}

async fn dependency_graph<E: QueryEngine>(
    State(svc): State<Observability<E>>,
    Query(params): Query<RangeParams>,
) -> ApiResult<DependencyGraph> {
    Ok(Json(svc.dependency_graph(params.range()?).await?))
}

async fn store_info<E: QueryEngine>(State(svc): State<Observability<E>>) -> ApiResult<StoreStatus> {
    Ok(Json(svc.store_status().await?))
}
