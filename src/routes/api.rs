use crate::{handlers::{diagnostics, health_check, presence, ready_check}, routes::auth_middleware::auth_middleware, state::AppState};
use axum::{routing::get, Router, middleware};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/presence", get(presence))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)) // Applies to all routes added above
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
}
