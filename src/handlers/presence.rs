use crate::{auth::auth::{self, error_response, ApiError}, models::{Identity, PresenceResponse}, state::AppState};
use axum::{extract::{Extension, Query, State}, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct PresenceQuery {
    pub path: String,
}

/// List who else is currently editing a file
pub async fn presence(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PresenceQuery>,
) -> Result<Json<PresenceResponse>, ApiError> {
    let path = state.files.resolve(&query.path).await.map_err(|e| {
        debug!("Invalid presence path '{}': {}", query.path, e);
        error_response(StatusCode::BAD_REQUEST, "Invalid path")
    })?;
    auth::ensure_project_access(state.access.as_ref(), &identity, path.project())?;

    let editors = state
        .registry
        .list_others(path.relative(), identity.id, Utc::now())
        .await;
    Ok(Json(PresenceResponse {
        path: path.relative().to_string(),
        editors,
    }))
}
