use axum::{http::StatusCode, Json};
use crate::models::{ErrorResponse, Identity};
use crate::services::project_service::{AccessChecker, AccessDecision};

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse {
        code: status.as_u16(),
        status: status.to_string(),
        error: error.into(),
    }))
}

pub fn ensure_admin(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_admin {
        return Ok(());
    }
    Err(error_response(StatusCode::FORBIDDEN, "Administrator access required"))
}

pub fn ensure_project_access(access: &dyn AccessChecker, identity: &Identity, project: &str) -> Result<(), ApiError> {
    match access.check(identity, project) {
        AccessDecision::Allowed => Ok(()),
        AccessDecision::Denied => Err(error_response(StatusCode::FORBIDDEN, "Access denied")),
        AccessDecision::ProjectNotFound => Err(error_response(StatusCode::NOT_FOUND, "Project not found")),
    }
}
