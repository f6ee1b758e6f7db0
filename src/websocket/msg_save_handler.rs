use chrono::Utc;
use tracing::info;

use crate::models::{ContentUpdateMessage, SaveMessage, SaveReply, SendMessage, SessionError};
use crate::state::AppState;
use crate::websocket::session::Session;

/// Handle SaveMessage - overwrite the whole file, last writer wins
pub async fn handle_save_message(
    session: &mut Session,
    state: &AppState,
    save_msg: SaveMessage,
) -> Result<(), SessionError> {
    let (raw, content) = match (save_msg.path.filter(|p| !p.is_empty()), save_msg.content) {
        (Some(raw), Some(content)) => (raw, content),
        _ => return Err(SessionError::PathAndContentRequired),
    };
    let path = session.authorize(state, &raw).await?;
    if !state.files.parent_exists(&path).await {
        return Err(SessionError::ParentNotFound);
    }

    // Holding the file lock orders this save against every other operation on the file.
    let mut guard = state.registry.lock(path.relative()).await;
    state.files.write(&path, &content).await?;

    let now = Utc::now();
    let user_id = session.identity().id;
    guard.touch(user_id, now);

    state
        .broadcaster
        .send_to(session.conn(), &SendMessage::Save(SaveReply::success()))
        .await;

    let update = SendMessage::ContentUpdate(ContentUpdateMessage {
        content,
        user: session.user_ref(),
    });
    let peers = state.broadcaster.broadcast(&guard, &update, Some(user_id)).await;
    state.broadcaster.broadcast_active_editors(&guard, now).await;

    info!(
        "User {} saved {} (notified {} peers)",
        session.identity().username,
        path.relative(),
        peers
    );
    Ok(())
}
