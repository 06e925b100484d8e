mod topics;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vinted_cache::{CacheError, Orchestrator};

use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "bad_request" => StatusCode::BAD_REQUEST,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "timeout" => StatusCode::GATEWAY_TIMEOUT,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

pub(super) fn map_cache_error(request_id: String, topic: &str, error: &CacheError) -> ApiError {
    match error {
        CacheError::InvalidTopic => {
            ApiError::new(request_id, "bad_request", "topic must not be empty")
        }
        CacheError::Fetch(e) => {
            tracing::warn!(topic, error = %e, "listing fetch failed");
            ApiError::new(request_id, "upstream_error", "listing source request failed")
        }
        CacheError::Timeout { .. } => {
            tracing::warn!(topic, error = %error, "topic request timed out");
            ApiError::new(request_id, "timeout", error.to_string())
        }
        CacheError::ShuttingDown => {
            ApiError::new(request_id, "unavailable", "server is shutting down")
        }
        CacheError::Persistence(e) => {
            tracing::error!(topic, error = %e, "topic persistence failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
        CacheError::Internal(e) => {
            tracing::error!(topic, error = %e, "topic request failed");
            ApiError::new(request_id, "internal_error", "internal error")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/topics/{topic}", get(topics::get_topic))
        .route(
            "/api/v1/topics/{topic}/{order}",
            get(topics::get_topic_with_order),
        )
        .route("/vintedTopic/{spec}", get(topics::get_legacy_topic))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

/// Pool statistics plus in-flight refresh and fetch counts. `503` while the
/// database ping fails.
async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let stats: BTreeMap<String, String> = state.orchestrator.health().await;
    let status = if stats.get("status").map(String::as_str) == Some("up") {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse {
            data: stats,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}
