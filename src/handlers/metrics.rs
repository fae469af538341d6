use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::error;

use crate::db::{ChatStore, StoreError};
use crate::models::*;
use crate::services::analytics_service::{self, DEFAULT_TOP_LIMIT};
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn store_of(state: &AppState) -> Result<Arc<ChatStore>, ApiError> {
    state.store.clone().ok_or_else(|| {
        ErrorResponse::with_status(StatusCode::SERVICE_UNAVAILABLE, "Analytics store is not configured")
    })
}

fn query_failed(what: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| {
        error!("Failed to query {}: {}", what, e);
        ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

/// Messages of a room in a time range
pub async fn room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<RoomMessagesResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::room_messages(&store, &room_id, &range.start, &range.end)
        .await
        .map(Json)
        .map_err(query_failed("room messages"))
}

/// Message history of a user
pub async fn user_messages(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(range): Query<OptionalTimeRangeQuery>,
) -> Result<Json<UserMessagesResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::user_messages(&store, &user_id, range.start.as_deref(), range.end.as_deref())
        .await
        .map(Json)
        .map_err(query_failed("user messages"))
}

/// Distinct users active in a time range
pub async fn active_users(
    State(state): State<AppState>,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<ActiveUsersResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::active_users(&store, &range.start, &range.end)
        .await
        .map(Json)
        .map_err(query_failed("active users"))
}

/// Rooms a user has posted in
pub async fn user_rooms(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRoomsResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::user_rooms(&store, &user_id)
        .await
        .map(Json)
        .map_err(query_failed("user rooms"))
}

pub async fn messages_per_minute(
    State(state): State<AppState>,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<MessagesPerMinuteResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::messages_per_minute_between(&store, &range.start, &range.end)
        .await
        .map(Json)
        .map_err(query_failed("messages per minute"))
}

pub async fn top_users(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<TopUsersResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::top_users_report(&store, query.limit.unwrap_or(DEFAULT_TOP_LIMIT))
        .await
        .map(Json)
        .map_err(query_failed("top users"))
}

pub async fn top_rooms(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<TopRoomsResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::top_rooms_report(&store, query.limit.unwrap_or(DEFAULT_TOP_LIMIT))
        .await
        .map(Json)
        .map_err(query_failed("top rooms"))
}

pub async fn user_participation(
    State(state): State<AppState>,
) -> Result<Json<UserParticipationResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::user_participation(&store)
        .await
        .map(Json)
        .map_err(query_failed("user participation"))
}

/// All queries and analytics for the last hour
pub async fn all_metrics(
    State(state): State<AppState>,
) -> Result<Json<AllMetricsResponse>, ApiError> {
    let store = store_of(&state)?;
    analytics_service::all_metrics(&store)
        .await
        .map(Json)
        .map_err(query_failed("all metrics"))
}
