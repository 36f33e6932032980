use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes, no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes, require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Positions
        .route(
            "/api/positions",
            get(handlers::positions::list).post(handlers::positions::create),
        )
        .route("/api/positions/:ticker", delete(handlers::positions::remove))
        // Control
        .route("/api/control/check", post(handlers::control::check))
        .route("/api/control/report", post(handlers::control::report))
        .route("/api/control/alerts/enable", post(handlers::control::enable_alerts))
        .route("/api/control/alerts/disable", post(handlers::control::disable_alerts))
        .route("/api/control/status", get(handlers::control::status))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
