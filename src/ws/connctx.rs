use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::Notify;
use uuid::Uuid;

/// Display colors handed out at handshake. Picked with replacement, so two
/// editors can share one.
pub const USER_COLORS: [&str; 10] = [
    "#E63946", "#1D3557", "#2A9D8F", "#6A4C93", "#F4A261",
    "#264653", "#023047", "#8338EC", "#06D6A0", "#073B4C",
];

pub fn random_color() -> &'static str {
    USER_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_COLORS[0])
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue closed")]
    Closed,
    #[error("send timed out")]
    Timeout,
}

#[derive(Debug)]
struct ConnInner {
    id: Uuid,
    outbound: mpsc::Sender<String>,
    shutdown: Notify,
    shutting_down: AtomicBool,
}

/// Shared handle to one live websocket connection.
///
/// Clones are held by the presence registry; the connection task owns the
/// receiving end of the outbound queue.
#[derive(Clone, Debug)]
pub struct ConnHandle {
    inner: Arc<ConnInner>,
}

impl ConnHandle {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        let handle = Self {
            inner: Arc::new(ConnInner {
                id: Uuid::new_v4(),
                outbound,
                shutdown: Notify::new(),
                shutting_down: AtomicBool::new(false),
            }),
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn same_as(&self, other: &ConnHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Queue a serialized frame, waiting at most `timeout` for queue space.
    pub async fn deliver(&self, text: String, timeout: Duration) -> Result<(), DeliveryError> {
        if self.is_shutting_down() {
            return Err(DeliveryError::Closed);
        }
        self.inner
            .outbound
            .send_timeout(text, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DeliveryError::Timeout,
                SendTimeoutError::Closed(_) => DeliveryError::Closed,
            })
    }

    /// Ask the connection task to tear down. Safe to call many times.
    pub fn shutdown(&self) {
        if !self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            self.inner.shutdown.notify_one();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Resolves once `shutdown` has been called.
    pub async fn wait_shutdown(&self) {
        if self.is_shutting_down() {
            return;
        }
        self.inner.shutdown.notified().await;
    }
}
