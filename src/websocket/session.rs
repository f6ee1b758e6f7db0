use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::models::{EditorEventMessage, Identity, ReceivedMessage, SendMessage, SessionError, UserRef};
use crate::services::file_service::ValidatedPath;
use crate::services::project_service::AccessDecision;
use crate::state::AppState;
use crate::websocket::msg_check_active_handler::handle_check_active_message;
use crate::websocket::msg_cursor_handler::handle_cursor_message;
use crate::websocket::msg_load_handler::handle_load_message;
use crate::websocket::msg_save_handler::handle_save_message;
use crate::ws::connctx::ConnHandle;

/// Where a connection stands. Unauthenticated upgrades never get a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    FileOpen(ValidatedPath),
    Closed,
}

/// Per-connection state machine, owned by the connection task.
pub struct Session {
    conn: ConnHandle,
    identity: Identity,
    color: &'static str,
    state: SessionState,
}

impl Session {
    pub fn new(conn: ConnHandle, identity: Identity, color: &'static str) -> Self {
        Self {
            conn,
            identity,
            color,
            state: SessionState::Authenticated,
        }
    }

    pub fn conn(&self) -> &ConnHandle {
        &self.conn
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    pub fn current_file(&self) -> Option<&ValidatedPath> {
        match &self.state {
            SessionState::FileOpen(path) => Some(path),
            _ => None,
        }
    }

    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.identity.id,
            username: self.identity.username.clone(),
            color: self.color.to_string(),
        }
    }

    pub(crate) fn open(&mut self, path: ValidatedPath) {
        self.state = SessionState::FileOpen(path);
    }

    /// Handle one text frame. Failures are reported to this connection only.
    pub async fn dispatch(&mut self, state: &AppState, text: &str) {
        if self.state == SessionState::Closed {
            return;
        }
        let result = match ReceivedMessage::parse(text) {
            Ok(message) => self.handle(state, message).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.report(state, e).await;
        }
    }

    async fn handle(&mut self, state: &AppState, message: ReceivedMessage) -> Result<(), SessionError> {
        match message {
            ReceivedMessage::Load(load_msg) => handle_load_message(self, state, load_msg).await,
            ReceivedMessage::Save(save_msg) => handle_save_message(self, state, save_msg).await,
            ReceivedMessage::CursorUpdate(cursor_msg) => handle_cursor_message(self, state, cursor_msg).await,
            ReceivedMessage::CheckActive(_) => handle_check_active_message(self, state).await,
        }
    }

    async fn report(&self, state: &AppState, err: SessionError) {
        match &err {
            SessionError::Io(e) => error!("I/O failure for user {}: {:?}", self.identity.username, e),
            SessionError::MalformedMessage | SessionError::InvalidOperation => {
                warn!("Rejected frame from user {}: {}", self.identity.username, err)
            }
            _ => info!("Request of user {} refused: {}", self.identity.username, err),
        }
        if !state.broadcaster.send_to(&self.conn, &SendMessage::error(&err)).await {
            debug!("Could not report error to connection {}", self.conn.id());
        }
    }

    /// Validate `raw` and check that this identity may use its project.
    pub(crate) async fn authorize(&self, state: &AppState, raw: &str) -> Result<ValidatedPath, SessionError> {
        let path = state.files.resolve(raw).await.map_err(|e| {
            debug!("Invalid path '{}': {}", raw, e);
            SessionError::InvalidPath
        })?;
        match state.access.check(&self.identity, path.project()) {
            AccessDecision::Allowed => Ok(path),
            AccessDecision::Denied => Err(SessionError::AccessDenied),
            AccessDecision::ProjectNotFound => Err(SessionError::ProjectNotFound),
        }
    }

    /// Drop this connection's presence on the open file, telling the rest.
    pub(crate) async fn leave_file(&mut self, state: &AppState) {
        let Some(path) = self.current_file().cloned() else {
            return;
        };
        self.state = SessionState::Authenticated;

        let mut guard = state.registry.lock(path.relative()).await;
        let Some(entry) = guard.remove_owned(self.identity.id, &self.conn) else {
            debug!(
                "Connection {} no longer owns the presence of {} on {}",
                self.conn.id(),
                self.identity.username,
                path.relative()
            );
            return;
        };
        let left = SendMessage::EditorLeft(EditorEventMessage { user: entry.user_ref() });
        state.broadcaster.broadcast(&guard, &left, None).await;
        state.broadcaster.broadcast_active_editors(&guard, Utc::now()).await;
        info!("User {} left {} ({} remaining)", self.identity.username, guard.path(), guard.len());
    }

    /// Teardown. Runs its effects once however often it is called.
    pub async fn close(&mut self, state: &AppState) {
        if self.state == SessionState::Closed {
            return;
        }
        self.leave_file(state).await;
        self.state = SessionState::Closed;
        info!("Session of user {} on connection {} closed", self.identity.username, self.conn.id());
    }
}
