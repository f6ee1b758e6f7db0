use chrono::Utc;
use std::io::ErrorKind;
use tracing::info;

use crate::models::{EditorEventMessage, LoadMessage, LoadReply, SendMessage, SessionError};
use crate::state::AppState;
use crate::websocket::session::Session;

/// Handle LoadMessage - open a file and join its editors
pub async fn handle_load_message(
    session: &mut Session,
    state: &AppState,
    load_msg: LoadMessage,
) -> Result<(), SessionError> {
    let raw = load_msg
        .path
        .filter(|p| !p.is_empty())
        .ok_or(SessionError::PathRequired)?;
    let path = session.authorize(state, &raw).await?;
    if !state.files.is_file(&path).await {
        return Err(SessionError::FileNotFound);
    }

    // Switching files leaves the previous one first.
    let switching = session
        .current_file()
        .map(|open| open.relative() != path.relative())
        .unwrap_or(false);
    if switching {
        session.leave_file(state).await;
    }

    let mut guard = state.registry.lock(path.relative()).await;
    let content = state.files.read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => SessionError::FileNotFound,
        _ => SessionError::Io(e),
    })?;

    let now = Utc::now();
    let identity = session.identity().clone();
    guard.register(&identity, session.conn(), session.color(), now);
    session.open(path.clone());

    let reply = SendMessage::Load(LoadReply {
        content,
        current_user_id: identity.id,
        username: identity.username.clone(),
        color: session.color().to_string(),
        active_editors: guard.list_others(identity.id, now),
    });
    state.broadcaster.send_to(session.conn(), &reply).await;

    let joined = SendMessage::EditorJoined(EditorEventMessage { user: session.user_ref() });
    state.broadcaster.broadcast(&guard, &joined, Some(identity.id)).await;

    info!("User {} opened {} ({} editors)", identity.username, path.relative(), guard.len());
    Ok(())
}
