use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json};
use crate::models::HealthResponse;
use crate::state::AppState;
use tracing::{debug, warn};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("{} is running", state.config.service_name),
    })
}

/// Readiness check endpoint, ready once the projects root is reachable
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");
    match tokio::fs::metadata(state.files.root()).await {
        Ok(meta) if meta.is_dir() => (StatusCode::OK, Json(HealthResponse {
            status: "ok".to_string(),
            message: "Service is ready".to_string(),
        })),
        _ => {
            warn!("Projects root {} is not available", state.files.root().display());
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse {
                status: "unavailable".to_string(),
                message: "Projects root is not available".to_string(),
            }))
        }
    }
}
