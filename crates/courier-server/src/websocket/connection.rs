//! Per-connection handle shared between the socket loop, the registry,
//! and the broadcaster.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use courier_core::events::ServerEvent;
use courier_core::ids::DeviceId;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

/// A live client connection.
///
/// The socket itself is owned by the transport loop in `handler`; everyone
/// else talks to the connection through a bounded outbound channel. A full
/// or closed channel makes `send` return `false` — callers log and move on,
/// sends are never retried.
pub struct ClientConnection {
    /// Server-assigned identity, fixed for the connection lifetime.
    pub device_id: DeviceId,
    outbound: mpsc::Sender<Arc<String>>,
    dropped: AtomicU64,
    last_activity: Mutex<Instant>,
}

impl ClientConnection {
    /// Create a handle around the outbound channel sender.
    pub fn new(device_id: DeviceId, outbound: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            device_id,
            outbound,
            dropped: AtomicU64::new(0),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Queue a pre-serialized payload. Returns `false` (and counts a drop)
    /// if the channel is full or closed.
    pub fn send(&self, payload: Arc<String>) -> bool {
        match self.outbound.try_send(payload) {
            Ok(()) => true,
            Err(_) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Serialize and queue a structured server event.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(device_id = %self.device_id, error = %e, "failed to serialize server event");
                false
            }
        }
    }

    /// Serialize and queue a raw JSON event (chat echoes, broadcasts).
    pub fn send_value(&self, event: &Value) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(device_id = %self.device_id, error = %e, "failed to serialize event");
                false
            }
        }
    }

    /// Whether the connection can still accept sends.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Record inbound activity (resets the idle clock).
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Total lifetime send drops for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
