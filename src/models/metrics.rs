use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct TimeRangeQuery {
    pub start: String,
    pub end: String,
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct OptionalTimeRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessagesResponse {
    pub room_id: String,
    pub start_time: String,
    pub end_time: String,
    pub message_count: usize,
    pub query_time_ms: u64,
    pub performance_target: String,
    pub performance_met: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserMessagesResponse {
    pub user_id: String,
    pub message_count: usize,
    pub messages: Vec<crate::models::QueueMessage>,
    pub query_time_ms: u64,
    pub performance_target: String,
    pub performance_met: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUsersResponse {
    pub start_time: String,
    pub end_time: String,
    pub active_user_count: usize,
    pub query_time_ms: u64,
    pub performance_target: String,
    pub performance_met: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomParticipation {
    pub room_id: String,
    pub message_count: i64,
    pub last_activity_time: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRoomsResponse {
    pub user_id: String,
    pub room_count: usize,
    pub rooms: Vec<RoomParticipation>,
    pub query_time_ms: u64,
    pub performance_target: String,
    pub performance_met: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MessagesPerMinuteResponse {
    pub start_time: String,
    pub end_time: String,
    pub messages_per_minute: BTreeMap<String, u64>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub user_id: String,
    pub username: String,
    pub message_count: u64,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TopUsersResponse {
    pub top_users: Vec<TopUser>,
    pub limit: u32,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopRoom {
    pub room_id: String,
    pub message_count: u64,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TopRoomsResponse {
    pub top_rooms: Vec<TopRoom>,
    pub limit: u32,
}

/// Users bucketed by how many rooms they have posted in
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationDistribution {
    pub single_room: u64,
    pub light_users: u64,
    pub moderate_users: u64,
    pub heavy_users: u64,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserParticipationResponse {
    pub total_users: usize,
    pub average_rooms_per_user: String,
    pub distribution: ParticipationDistribution,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AllMetricsResponse {
    pub sample_room_messages: RoomMessagesResponse,
    pub active_users: ActiveUsersResponse,
    pub top_users: TopUsersResponse,
    pub top_rooms: TopRoomsResponse,
    pub messages_per_minute: MessagesPerMinuteResponse,
    pub user_participation: UserParticipationResponse,
    pub timestamp: String,
    pub query_note: String,
}
