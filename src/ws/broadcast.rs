use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::time::Duration;
use tracing::{error, warn};

use crate::models::{ActiveEditorsMessage, SendMessage, UserId};
use crate::ws::connctx::ConnHandle;
use crate::ws::presence::FileGuard;

/// Fan-out of server messages to the editors of a file.
///
/// Callers hold the file's [`FileGuard`] for the whole call, so frames on one
/// file are queued for every recipient in call order.
#[derive(Clone, Debug)]
pub struct Broadcaster {
    send_timeout: Duration,
}

impl Broadcaster {
    pub fn new(send_timeout: Duration) -> Self {
        Self { send_timeout }
    }

    /// Send one message to a single connection.
    pub async fn send_to(&self, conn: &ConnHandle, message: &SendMessage) -> bool {
        let Some(text) = encode(message) else {
            return false;
        };
        self.deliver_all(vec![(conn.clone(), text)]).await == 1
    }

    /// Send `message` to every editor of the guarded file except `exclude`.
    /// Returns the number of recipients that accepted it.
    pub async fn broadcast(&self, guard: &FileGuard<'_>, message: &SendMessage, exclude: Option<UserId>) -> usize {
        let Some(text) = encode(message) else {
            return 0;
        };
        let targets: Vec<(ConnHandle, String)> = guard
            .entries()
            .filter(|entry| Some(entry.identity.id) != exclude)
            .map(|entry| (entry.conn.clone(), text.clone()))
            .collect();
        self.deliver_all(targets).await
    }

    /// Send every editor the live editors other than themselves.
    pub async fn broadcast_active_editors(&self, guard: &FileGuard<'_>, now: DateTime<Utc>) -> usize {
        let targets: Vec<(ConnHandle, String)> = guard
            .entries()
            .filter_map(|entry| {
                let message = SendMessage::ActiveEditors(ActiveEditorsMessage {
                    users: guard.list_others(entry.identity.id, now),
                    content: None,
                });
                encode(&message).map(|text| (entry.conn.clone(), text))
            })
            .collect();
        self.deliver_all(targets).await
    }

    async fn deliver_all(&self, targets: Vec<(ConnHandle, String)>) -> usize {
        let timeout = self.send_timeout;
        let results = join_all(targets.into_iter().map(|(conn, text)| async move {
            match conn.deliver(text, timeout).await {
                Ok(()) => true,
                Err(e) => {
                    // The recipient's own task runs the teardown.
                    warn!("Dropping connection {} after failed delivery: {}", conn.id(), e);
                    conn.shutdown();
                    false
                }
            }
        }))
        .await;
        results.into_iter().filter(|delivered| *delivered).count()
    }
}

fn encode(message: &SendMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to serialize outbound message: {}", e);
            None
        }
    }
}
