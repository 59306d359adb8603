//! Rutas HTTP
//!
//! La API REST vive bajo `/api/v1` y el WebSocket bajo `/ws`.

pub mod realtime_routes;
pub mod route_routes;
pub mod trip_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::cors_middleware;
use crate::state::AppState;

/// Router completo con CORS y trazas
pub fn create_app(state: AppState) -> Router {
    let cors = cors_middleware(&state.config.cors_origins);

    let api = Router::new()
        .route("/health", get(health))
        .nest("/trips", trip_routes::create_trip_router())
        .nest("/routes", route_routes::create_route_router());

    Router::new()
        .nest("/api/v1", api)
        .nest("/ws", realtime_routes::create_realtime_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "trip-service",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
