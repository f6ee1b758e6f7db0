use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Failure of a single websocket request.
///
/// The display text is what the requester sees in the `error` reply, so I/O
/// failures render as a generic message and keep their detail in the source.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid message format")]
    MalformedMessage,
    #[error("Invalid operation type")]
    InvalidOperation,
    #[error("Path is required")]
    PathRequired,
    #[error("Path and content are required")]
    PathAndContentRequired,
    #[error("Invalid path")]
    InvalidPath,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Access denied")]
    AccessDenied,
    #[error("File not found")]
    FileNotFound,
    #[error("Parent directory not found")]
    ParentNotFound,
    #[error("Internal server error")]
    Io(#[from] std::io::Error),
}
