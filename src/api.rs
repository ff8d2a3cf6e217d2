// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::RegistryError;
use crate::ingest::aggregate::{group_by_source_topic, SourceGroup, TopicGroup};
use crate::ingest::{Aggregator, NormalizedItem};
use crate::notify::{DigestDispatcher, DispatchOutcome};
use crate::registry::{Registry, SourceRecord, TopicRecord};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub registry: Arc<Registry>,
    pub dispatcher: Arc<DigestDispatcher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/news", get(news))
        .route("/api/news/grouped", get(news_grouped))
        .route("/api/news/by-topic", get(news_by_topic))
        .route("/api/topics", get(list_topics).post(add_topic))
        .route("/api/topics/{index}", put(edit_topic).delete(delete_topic))
        .route("/api/sources", get(list_sources).post(add_source))
        .route("/api/sources/{index}", put(edit_source).delete(delete_source))
        .route("/api/sources/{index}/alerts", post(toggle_alerts))
        .route("/api/digest/send", post(send_digest))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Registry failure rendered as `{"error": "..."}`.
pub struct ApiError(RegistryError);

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RegistryError::InvalidIndex { .. } => StatusCode::NOT_FOUND,
            RegistryError::Duplicate(_) => StatusCode::CONFLICT,
            RegistryError::EmptyValue(_) | RegistryError::InvalidFeed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RegistryError::Storage(e) => {
                tracing::error!(target: "registry", error = ?e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
struct TopicBody {
    topic: String,
}

#[derive(Deserialize)]
struct SourceBody {
    name: String,
    url: String,
}

async fn news(State(state): State<AppState>) -> Json<Vec<NormalizedItem>> {
    Json(state.aggregator.get_merged_news().await)
}

async fn news_grouped(State(state): State<AppState>) -> Json<Vec<SourceGroup>> {
    let items = state.aggregator.get_merged_news().await;
    Json(group_by_source_topic(items))
}

async fn news_by_topic(State(state): State<AppState>) -> Json<Vec<TopicGroup>> {
    let groups = state
        .aggregator
        .topic_search_by_topic(Utc::now())
        .await
        .into_iter()
        .map(|(topic, items)| TopicGroup { topic, items })
        .collect();
    Json(groups)
}

async fn list_topics(State(state): State<AppState>) -> Json<Vec<TopicRecord>> {
    Json(state.registry.topics())
}

async fn add_topic(
    State(state): State<AppState>,
    Json(body): Json<TopicBody>,
) -> ApiResult<(StatusCode, Json<Vec<TopicRecord>>)> {
    state.registry.add_topic(&body.topic).await?;
    Ok((StatusCode::CREATED, Json(state.registry.topics())))
}

async fn edit_topic(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(body): Json<TopicBody>,
) -> ApiResult<Json<Vec<TopicRecord>>> {
    state.registry.edit_topic(index, &body.topic).await?;
    Ok(Json(state.registry.topics()))
}

async fn delete_topic(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<TopicRecord>> {
    Ok(Json(state.registry.delete_topic(index).await?))
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceRecord>> {
    Json(state.registry.sources())
}

async fn add_source(
    State(state): State<AppState>,
    Json(body): Json<SourceBody>,
) -> ApiResult<(StatusCode, Json<Vec<SourceRecord>>)> {
    state.registry.add_source(&body.name, &body.url).await?;
    Ok((StatusCode::CREATED, Json(state.registry.sources())))
}

async fn edit_source(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(body): Json<SourceBody>,
) -> ApiResult<Json<Vec<SourceRecord>>> {
    state
        .registry
        .edit_source(index, &body.name, &body.url)
        .await?;
    Ok(Json(state.registry.sources()))
}

async fn delete_source(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<SourceRecord>> {
    Ok(Json(state.registry.delete_source(index).await?))
}

async fn toggle_alerts(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<serde_json::Value>> {
    let enabled = state.registry.toggle_alerts(index).await?;
    Ok(Json(json!({ "index": index, "alerts_enabled": enabled })))
}

async fn send_digest(State(state): State<AppState>) -> Json<DispatchOutcome> {
    Json(state.dispatcher.dispatch().await)
}
