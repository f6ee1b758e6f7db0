use chrono::Utc;
use tracing::{debug, warn};

use crate::models::{ActiveEditorsMessage, SendMessage, SessionError};
use crate::state::AppState;
use crate::websocket::session::Session;

/// Handle CheckActiveMessage - resend content and editors to the requester only
pub async fn handle_check_active_message(session: &mut Session, state: &AppState) -> Result<(), SessionError> {
    let Some(path) = session.current_file() else {
        debug!("Ignoring check_active without an open file");
        return Ok(());
    };

    let guard = state.registry.lock(path.relative()).await;
    let content = match state.files.read(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Could not re-read {}: {}", path.relative(), e);
            None
        }
    };
    let reply = SendMessage::ActiveEditors(ActiveEditorsMessage {
        users: guard.list_others(session.identity().id, Utc::now()),
        content,
    });
    state.broadcaster.send_to(session.conn(), &reply).await;
    Ok(())
}
