use chrono::Utc;
use tracing::debug;

use crate::models::{CursorBroadcastMessage, CursorUpdateMessage, SendMessage, SessionError};
use crate::state::AppState;
use crate::websocket::session::Session;
use crate::ws::presence::unix_seconds;

/// Handle CursorUpdateMessage - record the move, broadcast when not throttled
pub async fn handle_cursor_message(
    session: &mut Session,
    state: &AppState,
    cursor_msg: CursorUpdateMessage,
) -> Result<(), SessionError> {
    let Some(path) = session.current_file() else {
        debug!("Ignoring cursor update without an open file");
        return Ok(());
    };

    let now = Utc::now();
    let user_id = session.identity().id;
    let mut guard = state.registry.lock(path.relative()).await;
    if guard.update_cursor(user_id, cursor_msg.position, now) {
        let moved = SendMessage::CursorUpdate(CursorBroadcastMessage {
            user: session.user_ref(),
            position: cursor_msg.position,
            timestamp: unix_seconds(now),
        });
        state.broadcaster.broadcast(&guard, &moved, Some(user_id)).await;
    }
    Ok(())
}
