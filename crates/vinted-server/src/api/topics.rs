use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use vinted_cache::TopicResponse;

use crate::middleware::RequestId;

use super::{map_cache_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct OrderQuery {
    pub order: Option<String>,
}

pub(super) async fn get_topic(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(topic): Path<String>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ApiResponse<TopicResponse>>, ApiError> {
    serve_topic(&state, req_id, &topic, query.order.as_deref().unwrap_or_default()).await
}

pub(super) async fn get_topic_with_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((topic, order)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TopicResponse>>, ApiError> {
    serve_topic(&state, req_id, &topic, &order).await
}

/// `GET /vintedTopic/{topic}-{order}`, kept for existing clients.
pub(super) async fn get_legacy_topic(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(spec): Path<String>,
) -> Result<Json<ApiResponse<TopicResponse>>, ApiError> {
    let (topic, order) = split_legacy_spec(&spec);
    serve_topic(&state, req_id, topic, order).await
}

async fn serve_topic(
    state: &AppState,
    req_id: RequestId,
    topic: &str,
    order: &str,
) -> Result<Json<ApiResponse<TopicResponse>>, ApiError> {
    let data = state
        .orchestrator
        .get_topic(topic, order)
        .await
        .map_err(|e| map_cache_error(req_id.0.clone(), topic, &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Splits `{topic}-{order}` on the last `-`. Without a `-` the whole segment
/// is the topic and the order falls back to the default.
fn split_legacy_spec(spec: &str) -> (&str, &str) {
    spec.rsplit_once('-').unwrap_or((spec, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_spec_splits_on_last_dash() {
        assert_eq!(
            split_legacy_spec("t-shirt-price_low_to_high"),
            ("t-shirt", "price_low_to_high")
        );
        assert_eq!(split_legacy_spec("levis-relevance"), ("levis", "relevance"));
    }

    #[test]
    fn legacy_spec_without_dash_is_all_topic() {
        assert_eq!(split_legacy_spec("levis"), ("levis", ""));
    }
}
