use axum::{extract::State, Json};
use crate::{models::HealthResponse, state::AppState};
use tracing::debug;

fn health_response(state: &AppState, message: &str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: message.to_string(),
        connections: state.registry.connection_count(),
        analytics: state.store.is_some(),
    })
}

/// Liveness probe
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");
    health_response(&state, "Server is running")
}

/// Readiness probe. The fan-out engine has no external dependency, so the
/// service is ready as soon as it accepts requests; analytics may be absent.
pub async fn ready_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    health_response(&state, "Service is ready")
}
