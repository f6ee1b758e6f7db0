use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{EditorInfo, SessionError, UserId, UserRef};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoadMessage {
    pub path: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SaveMessage {
    pub path: Option<String>,
    pub content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CursorUpdateMessage {
    #[serde(default)]
    pub position: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckActiveMessage {}

/// Client to server frames.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReceivedMessage {
    Load(LoadMessage),
    Save(SaveMessage),
    CursorUpdate(CursorUpdateMessage),
    CheckActive(CheckActiveMessage),
}

const KNOWN_TYPES: [&str; 4] = ["load", "save", "cursor_update", "check_active"];

impl ReceivedMessage {
    /// Parse a text frame.
    ///
    /// Unparseable JSON and ill-typed fields are `MalformedMessage`; a missing
    /// or unknown `type` is `InvalidOperation`.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let value: Value = serde_json::from_str(text).map_err(|_| SessionError::MalformedMessage)?;
        let known = value
            .get("type")
            .and_then(Value::as_str)
            .map(|t| KNOWN_TYPES.contains(&t))
            .unwrap_or(false);
        if !known {
            return Err(SessionError::InvalidOperation);
        }
        serde_json::from_value(value).map_err(|_| SessionError::MalformedMessage)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoadReply {
    pub content: String,
    pub current_user_id: UserId,
    pub username: String,
    pub color: String,
    pub active_editors: Vec<EditorInfo>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SaveReply {
    pub status: String,
}

impl SaveReply {
    pub fn success() -> Self {
        Self { status: "success".to_string() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContentUpdateMessage {
    pub content: String,
    pub user: UserRef,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActiveEditorsMessage {
    pub users: Vec<EditorInfo>,
    /// Only set on `check_active` replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CursorBroadcastMessage {
    pub user: UserRef,
    pub position: u64,
    pub timestamp: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditorEventMessage {
    pub user: UserRef,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorMessage {
    pub message: String,
}

/// Server to client frames.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SendMessage {
    Load(LoadReply),
    Save(SaveReply),
    ContentUpdate(ContentUpdateMessage),
    ActiveEditors(ActiveEditorsMessage),
    CursorUpdate(CursorBroadcastMessage),
    EditorJoined(EditorEventMessage),
    EditorLeft(EditorEventMessage),
    Error(ErrorMessage),
}

impl SendMessage {
    pub fn error(err: &SessionError) -> Self {
        SendMessage::Error(ErrorMessage { message: err.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_frames() {
        let load = ReceivedMessage::parse(r#"{"type":"load","path":"proj/a.txt"}"#).unwrap();
        assert_eq!(load, ReceivedMessage::Load(LoadMessage { path: Some("proj/a.txt".into()) }));

        let save = ReceivedMessage::parse(r#"{"type":"save","path":"proj/a.txt"}"#).unwrap();
        assert_eq!(save, ReceivedMessage::Save(SaveMessage { path: Some("proj/a.txt".into()), content: None }));

        let cursor = ReceivedMessage::parse(r#"{"type":"cursor_update"}"#).unwrap();
        assert_eq!(cursor, ReceivedMessage::CursorUpdate(CursorUpdateMessage { position: 0 }));

        let check = ReceivedMessage::parse(r#"{"type":"check_active","extra":1}"#).unwrap();
        assert_eq!(check, ReceivedMessage::CheckActive(CheckActiveMessage {}));
    }

    #[test]
    fn unknown_or_missing_type_is_an_invalid_operation() {
        for text in [r#"{"type":"ping","content":"test"}"#, r#"{"path":"a"}"#, r#"{"type":7}"#, "[]"] {
            let err = ReceivedMessage::parse(text).unwrap_err();
            assert!(matches!(err, SessionError::InvalidOperation), "{text}");
        }
    }

    #[test]
    fn bad_json_and_bad_fields_are_malformed() {
        assert!(matches!(ReceivedMessage::parse("{not json"), Err(SessionError::MalformedMessage)));
        assert!(matches!(
            ReceivedMessage::parse(r#"{"type":"cursor_update","position":"ten"}"#),
            Err(SessionError::MalformedMessage)
        ));
    }

    #[test]
    fn outbound_frames_use_the_wire_names() {
        let user = UserRef { id: 1, username: "alice".into(), color: "#E63946".into() };
        let joined = serde_json::to_value(SendMessage::EditorJoined(EditorEventMessage { user })).unwrap();
        assert_eq!(
            joined,
            json!({"type": "editor_joined", "user": {"id": 1, "username": "alice", "color": "#E63946"}})
        );

        let saved = serde_json::to_value(SendMessage::Save(SaveReply::success())).unwrap();
        assert_eq!(saved, json!({"type": "save", "status": "success"}));

        let editors = serde_json::to_value(SendMessage::ActiveEditors(ActiveEditorsMessage {
            users: vec![],
            content: None,
        }))
        .unwrap();
        assert_eq!(editors, json!({"type": "active_editors", "users": []}));

        let err = serde_json::to_value(SendMessage::error(&SessionError::AccessDenied)).unwrap();
        assert_eq!(err, json!({"type": "error", "message": "Access denied"}));
    }
}
