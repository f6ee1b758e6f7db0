use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::models::{EditorInfo, Identity, UserId, UserRef};
use crate::ws::connctx::ConnHandle;

/// Minimum spacing between two broadcast cursor updates of one editor.
pub const CURSOR_THROTTLE_MS: i64 = 50;
/// A jump of more than this many characters bypasses the throttle.
pub const CURSOR_JUMP_CHARS: u64 = 10;
/// Editors idle for longer than this are left out of presence listings.
pub const LIVENESS_WINDOW_SECS: i64 = 60;

pub fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

#[derive(Clone, Debug)]
pub struct PresenceEntry {
    pub conn: ConnHandle,
    pub identity: Identity,
    pub color: &'static str,
    pub cursor: u64,
    pub last_active: DateTime<Utc>,
}

impl PresenceEntry {
    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.identity.id,
            username: self.identity.username.clone(),
            color: self.color.to_string(),
        }
    }

    pub fn editor_info(&self) -> EditorInfo {
        EditorInfo {
            id: self.identity.id,
            username: self.identity.username.clone(),
            color: self.color.to_string(),
            cursor: self.cursor,
            last_active: unix_seconds(self.last_active),
        }
    }
}

#[derive(Default)]
struct FileState {
    /// Set once the last entry left; the session is no longer in the registry.
    closed: bool,
    entries: HashMap<UserId, PresenceEntry>,
}

type SharedFileState = Arc<AsyncMutex<FileState>>;

/// Who is viewing which file.
///
/// Every file has its own async mutex; all reads and writes of a file's
/// entries, and the broadcasts that follow them, happen under a [`FileGuard`].
#[derive(Default)]
pub struct PresenceRegistry {
    files: Mutex<HashMap<String, SharedFileState>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, SharedFileState>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the session of `path`, creating it when nobody has it open.
    pub async fn lock(&self, path: &str) -> FileGuard<'_> {
        debug_assert!(!path.is_empty(), "presence path must not be empty");
        loop {
            let session = self.files().entry(path.to_string()).or_default().clone();
            let state = session.clone().lock_owned().await;
            if state.closed {
                // Emptied while we waited; the next lookup yields a fresh session.
                continue;
            }
            return FileGuard {
                registry: self,
                path: path.to_string(),
                session,
                state,
            };
        }
    }

    /// Number of files with at least one editor.
    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    /// Number of presence entries across all files.
    pub async fn entry_count(&self) -> usize {
        let sessions: Vec<SharedFileState> = self.files().values().cloned().collect();
        let mut total = 0;
        for session in sessions {
            total += session.lock().await.entries.len();
        }
        total
    }

    /// One-shot listing of the editors of `path` other than `exclude`.
    pub async fn list_others(&self, path: &str, exclude: UserId, now: DateTime<Utc>) -> Vec<EditorInfo> {
        if !self.files().contains_key(path) {
            return Vec::new();
        }
        self.lock(path).await.list_others(exclude, now)
    }
}

/// Exclusive access to one file's presence set.
pub struct FileGuard<'a> {
    registry: &'a PresenceRegistry,
    path: String,
    session: SharedFileState,
    state: OwnedMutexGuard<FileState>,
}

impl FileGuard<'_> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    pub fn get(&self, id: UserId) -> Option<&PresenceEntry> {
        self.state.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PresenceEntry> {
        self.state.entries.values()
    }

    /// Insert or replace the entry of `identity`.
    pub fn register(
        &mut self,
        identity: &Identity,
        conn: &ConnHandle,
        color: &'static str,
        now: DateTime<Utc>,
    ) -> PresenceEntry {
        let entry = PresenceEntry {
            conn: conn.clone(),
            identity: identity.clone(),
            color,
            cursor: 0,
            last_active: now,
        };
        if let Some(previous) = self.state.entries.insert(identity.id, entry.clone()) {
            if !previous.conn.same_as(conn) {
                debug!(
                    "Connection {} replaced {} for user {} on {}",
                    conn.id(),
                    previous.conn.id(),
                    identity.username,
                    self.path
                );
            }
        }
        entry
    }

    /// Record a cursor move. Returns whether it should be broadcast.
    pub fn update_cursor(&mut self, id: UserId, offset: u64, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.state.entries.get_mut(&id) else {
            return false;
        };
        let elapsed = now - entry.last_active;
        let jumped = offset.abs_diff(entry.cursor) > CURSOR_JUMP_CHARS;
        if elapsed >= TimeDelta::milliseconds(CURSOR_THROTTLE_MS) || jumped {
            entry.cursor = offset;
            entry.last_active = now;
            true
        } else {
            false
        }
    }

    /// Mark `id` active without moving its cursor.
    pub fn touch(&mut self, id: UserId, now: DateTime<Utc>) {
        if let Some(entry) = self.state.entries.get_mut(&id) {
            entry.last_active = now;
        }
    }

    /// Live editors other than `exclude`, most recently active first.
    pub fn list_others(&self, exclude: UserId, now: DateTime<Utc>) -> Vec<EditorInfo> {
        let window = TimeDelta::seconds(LIVENESS_WINDOW_SECS);
        let mut live: Vec<&PresenceEntry> = self
            .state
            .entries
            .values()
            .filter(|entry| entry.identity.id != exclude)
            .filter(|entry| now - entry.last_active <= window)
            .collect();
        live.sort_by(|a, b| {
            b.last_active
                .cmp(&a.last_active)
                .then_with(|| a.identity.id.cmp(&b.identity.id))
        });
        live.into_iter().map(PresenceEntry::editor_info).collect()
    }

    /// Remove the entry of `id` whichever connection owns it.
    pub fn remove(&mut self, id: UserId) -> Option<PresenceEntry> {
        let removed = self.state.entries.remove(&id);
        self.close_if_empty();
        removed
    }

    /// Remove the entry of `id` only while `conn` still owns it.
    pub fn remove_owned(&mut self, id: UserId, conn: &ConnHandle) -> Option<PresenceEntry> {
        let owned = self
            .get(id)
            .map(|entry| entry.conn.same_as(conn))
            .unwrap_or(false);
        if owned {
            self.remove(id)
        } else {
            None
        }
    }

    fn close_if_empty(&mut self) {
        if !self.is_empty() || self.state.closed {
            return;
        }
        self.state.closed = true;
        let mut files = self.registry.files();
        if files
            .get(&self.path)
            .map(|current| Arc::ptr_eq(current, &self.session))
            .unwrap_or(false)
        {
            files.remove(&self.path);
        }
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        // A session that was locked but never populated must not linger.
        self.close_if_empty();
    }
}
