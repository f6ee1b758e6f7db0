use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::UserId;

/// Who did something, as shown to peers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct UserRef {
    pub id: UserId,
    pub username: String,
    pub color: String,
}

/// Presence descriptor of one editor on a file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct EditorInfo {
    pub id: UserId,
    pub username: String,
    pub color: String,
    pub cursor: u64,
    /// Last activity, UNIX seconds
    pub last_active: f64,
}

/// Response for the presence listing of a file
#[derive(Serialize, Deserialize, ToSchema)]
pub struct PresenceResponse {
    pub path: String,
    pub editors: Vec<EditorInfo>,
}
