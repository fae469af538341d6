use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Broadcast a persisted message to the live members of its room
#[utoipa::path(
    post,
    path = "/api/broadcast",
    request_body = QueueMessage,
    responses(
        (status = 200, description = "\"Broadcasted to N clients\" or \"No active clients in room\"", body = String),
        (status = 400, description = "Missing or malformed message fields", body = String),
        (status = 500, description = "Room could not be resolved", body = String)
    )
)]
#[allow(dead_code)]
pub async fn broadcast_doc() {}

/// Health check for the broadcast API
#[utoipa::path(
    get,
    path = "/api/broadcast/health",
    responses(
        (status = 200, description = "Broadcast API is healthy", body = String)
    )
)]
#[allow(dead_code)]
pub async fn broadcast_health_doc() {}

/// Connection, room and process statistics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Messages of a room in a time range
#[utoipa::path(
    get,
    path = "/api/metrics/room/{room_id}/messages",
    params(("room_id" = String, Path, description = "Room identifier"), TimeRangeQuery),
    responses(
        (status = 200, description = "Message count for the range", body = RoomMessagesResponse),
        (status = 503, description = "Analytics store not configured", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn room_messages_doc() {}

/// Message history of a user
#[utoipa::path(
    get,
    path = "/api/metrics/user/{user_id}/messages",
    params(("user_id" = String, Path, description = "User identifier"), OptionalTimeRangeQuery),
    responses(
        (status = 200, description = "Messages of the user", body = UserMessagesResponse),
        (status = 503, description = "Analytics store not configured", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn user_messages_doc() {}

/// Distinct users active in a time range
#[utoipa::path(
    get,
    path = "/api/metrics/users/active",
    params(TimeRangeQuery),
    responses(
        (status = 200, description = "Active user count", body = ActiveUsersResponse),
        (status = 503, description = "Analytics store not configured", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn active_users_doc() {}

/// Rooms a user has posted in
#[utoipa::path(
    get,
    path = "/api/metrics/user/{user_id}/rooms",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Rooms of the user", body = UserRoomsResponse),
        (status = 503, description = "Analytics store not configured", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn user_rooms_doc() {}

#[utoipa::path(
    get,
    path = "/api/metrics/analytics/messages-per-minute",
    params(TimeRangeQuery),
    responses(
        (status = 200, description = "Messages bucketed by minute", body = MessagesPerMinuteResponse)
    )
)]
#[allow(dead_code)]
pub async fn messages_per_minute_doc() {}

#[utoipa::path(
    get,
    path = "/api/metrics/analytics/top-users",
    params(LimitQuery),
    responses(
        (status = 200, description = "Most active users", body = TopUsersResponse)
    )
)]
#[allow(dead_code)]
pub async fn top_users_doc() {}

#[utoipa::path(
    get,
    path = "/api/metrics/analytics/top-rooms",
    params(LimitQuery),
    responses(
        (status = 200, description = "Most active rooms", body = TopRoomsResponse)
    )
)]
#[allow(dead_code)]
pub async fn top_rooms_doc() {}

#[utoipa::path(
    get,
    path = "/api/metrics/analytics/user-participation",
    responses(
        (status = 200, description = "Users by number of rooms", body = UserParticipationResponse)
    )
)]
#[allow(dead_code)]
pub async fn user_participation_doc() {}

#[utoipa::path(
    get,
    path = "/api/metrics/all",
    responses(
        (status = 200, description = "All queries for the last hour", body = AllMetricsResponse)
    )
)]
#[allow(dead_code)]
pub async fn all_metrics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        broadcast_doc,
        broadcast_health_doc,
        diagnostics_doc,
        room_messages_doc,
        user_messages_doc,
        active_users_doc,
        user_rooms_doc,
        messages_per_minute_doc,
        top_users_doc,
        top_rooms_doc,
        user_participation_doc,
        all_metrics_doc,
    ),
    components(
        schemas(
            HealthResponse, ErrorResponse, QueueMessage, DiagnosticsResponse,
            RoomMessagesResponse, UserMessagesResponse, ActiveUsersResponse,
            RoomParticipation, UserRoomsResponse, MessagesPerMinuteResponse,
            TopUser, TopUsersResponse, TopRoom, TopRoomsResponse,
            ParticipationDistribution, UserParticipationResponse, AllMetricsResponse
        )
    ),
    tags(
        (name = "api", description = "Broadcast and analytics endpoints")
    )
)]
pub struct ApiDoc;
