use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type UserId = i64;

/// Authenticated user behind a connection or request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(id: UserId, username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id,
            username: username.into(),
            is_admin,
        }
    }
}
