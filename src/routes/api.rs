use axum::{http::HeaderValue, routing::{get, post}, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::handlers::{self, metrics};
use crate::state::AppState;
use crate::websocket::{websocket_handler, websocket_room_handler};

/// Create API routes
pub fn create_api_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/broadcast", post(handlers::broadcast_message))
        .route("/broadcast/health", get(handlers::broadcast_health))
        .route("/v1/diagnostics", get(handlers::diagnostics))
        .nest("/metrics", create_metrics_routes())
}

/// Read-only analytics over the persisted tables
pub fn create_metrics_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/room/:room_id/messages", get(metrics::room_messages))
        .route("/user/:user_id/messages", get(metrics::user_messages))
        .route("/user/:user_id/rooms", get(metrics::user_rooms))
        .route("/users/active", get(metrics::active_users))
        .route("/analytics/messages-per-minute", get(metrics::messages_per_minute))
        .route("/analytics/top-users", get(metrics::top_users))
        .route("/analytics/top-rooms", get(metrics::top_rooms))
        .route("/analytics/user-participation", get(metrics::user_participation))
        .route("/all", get(metrics::all_metrics))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// The complete route table
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::ready_check))
        .route("/ws", get(websocket_handler))
        .route("/ws/:room_id", get(websocket_room_handler))
        // Mount API routes
        .nest("/api", create_api_routes())
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
