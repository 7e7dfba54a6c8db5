//! Event fan-out to every open connection.

use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use super::registry::SessionRegistry;
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Maximum total lifetime message drops before forcibly deregistering a
/// slow client.
pub const MAX_TOTAL_DROPS: u64 = 100;

/// Best-effort fan-out over the session registry.
///
/// Not used by the message router — chat echoes are same-device only.
/// This is the mechanism a server-side event source uses to push one
/// message to all connected clients at once.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over the shared registry.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Serialize `event` once and send the identical payload to every open
    /// connection. Returns the number of successful deliveries. Failed
    /// sends are logged, never retried; clients past the lifetime drop
    /// threshold are deregistered.
    pub async fn broadcast(&self, event: &Value) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(error = %e, "failed to serialize broadcast event");
                return 0;
            }
        };

        let mut delivered = 0usize;
        let mut to_remove: Vec<Arc<ClientConnection>> = Vec::new();
        self.registry
            .for_each(|conn| {
                if conn.send(Arc::clone(&json)) {
                    delivered += 1;
                } else {
                    counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                    let drops = conn.drop_count();
                    if drops >= MAX_TOTAL_DROPS {
                        warn!(device_id = %conn.device_id, drops, "deregistering slow client");
                        to_remove.push(Arc::clone(conn));
                    } else {
                        warn!(device_id = %conn.device_id, total_drops = drops, "failed to send broadcast (channel full)");
                    }
                }
            })
            .await;

        for conn in &to_remove {
            self.registry.deregister(conn).await;
        }

        debug!(delivered, "broadcast event");
        delivered
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
