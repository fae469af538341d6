use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for health and readiness probes
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Live WebSocket connections
    pub connections: usize,
    /// Whether the analytics store is connected
    pub analytics: bool,
}
