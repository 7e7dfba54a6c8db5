//! Inbound frame classification and routing.
//!
//! Every failure here is contained: malformed input, storage hiccups, and
//! sends on dead connections are logged and dropped. Nothing propagates to
//! other sessions and nothing terminates the relay process.

use std::sync::Arc;

use courier_core::events::{
    EVENT_CHAT, EVENT_SUBSCRIBE, ServerEvent, event_type, stamp_device_id,
};
use courier_core::ids::DeviceId;
use courier_store::HistoryStore;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::connection::ClientConnection;
use super::registry::SessionRegistry;
use crate::metrics::{CHAT_MESSAGES_TOTAL, FRAMES_DROPPED_TOTAL, HISTORY_REPLAYS_TOTAL};

/// Classifies inbound events and dispatches them to the right handler.
#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
    history: Arc<dyn HistoryStore>,
}

impl MessageRouter {
    /// Create a router over the shared registry and history store.
    pub fn new(registry: Arc<SessionRegistry>, history: Arc<dyn HistoryStore>) -> Self {
        Self { registry, history }
    }

    /// Connection lifecycle: register, welcome, start the history backfill.
    ///
    /// The backfill runs as its own task and races any chat the client
    /// sends right after connecting — a fresh echo may arrive before the
    /// `history` event does. That eventual consistency is deliberate; new
    /// frames are never blocked on history delivery.
    pub async fn on_connect(&self, connection: &Arc<ClientConnection>) {
        self.registry.register(Arc::clone(connection)).await;

        let welcome = ServerEvent::Connection {
            device_id: connection.device_id.clone(),
            message: format!("connected as {}", connection.device_id),
        };
        if !connection.send_event(&welcome) {
            warn!(device_id = %connection.device_id, "failed to queue welcome event");
        }

        let registry = Arc::clone(&self.registry);
        let history = Arc::clone(&self.history);
        let device_id = connection.device_id.clone();
        let _ = tokio::spawn(async move {
            let messages = match history.read_all(device_id.as_str()).await {
                Ok(messages) => messages,
                Err(e) => {
                    error!(device_id = %device_id, error = %e, "failed to read chat history");
                    return;
                }
            };
            // The session may have gone away while the read was in flight;
            // a missing entry is the expected case, not an error.
            let Some(connection) = registry.lookup(device_id.as_str()).await else {
                debug!(device_id = %device_id, "session gone before history backfill");
                return;
            };
            if connection.send_event(&ServerEvent::History { messages }) {
                counter!(HISTORY_REPLAYS_TOTAL).increment(1);
            } else {
                warn!(device_id = %device_id, "failed to queue history backfill");
            }
        });
    }

    /// Connection teardown. Pointer-guarded so a stale socket closing late
    /// never tears down a newer session for the same identity.
    pub async fn on_disconnect(&self, connection: &Arc<ClientConnection>) {
        self.registry.deregister(connection).await;
    }

    /// Handle one inbound text frame from the identified sender.
    pub async fn handle_frame(&self, device_id: &DeviceId, raw: &str) {
        let mut event: Value = match serde_json::from_str(raw) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                warn!(device_id = %device_id, "dropping non-object frame");
                counter!(FRAMES_DROPPED_TOTAL, "reason" => "malformed").increment(1);
                return;
            }
            Err(e) => {
                warn!(device_id = %device_id, error = %e, "dropping unparseable frame");
                counter!(FRAMES_DROPPED_TOTAL, "reason" => "malformed").increment(1);
                return;
            }
        };

        // Identity is server-assigned and authoritative.
        stamp_device_id(&mut event, device_id);

        match event_type(&event) {
            Some(EVENT_CHAT) => self.handle_chat(device_id, event).await,
            Some(EVENT_SUBSCRIBE) => self.handle_subscribe(device_id, &event).await,
            other => {
                debug!(
                    device_id = %device_id,
                    event_type = other.unwrap_or("<missing>"),
                    "ignoring unrecognized event type"
                );
                counter!(FRAMES_DROPPED_TOTAL, "reason" => "unrecognized").increment(1);
            }
        }
    }

    /// Persist the chat message, then echo it back to the sender only.
    async fn handle_chat(&self, device_id: &DeviceId, event: Value) {
        let Some(content) = event.get("content").and_then(Value::as_str) else {
            warn!(device_id = %device_id, "dropping chat frame without string content");
            counter!(FRAMES_DROPPED_TOTAL, "reason" => "malformed").increment(1);
            return;
        };

        let record = match self.history.append(device_id.as_str(), content).await {
            Ok(record) => record,
            Err(e) => {
                // Echo is skipped; the connection stays open.
                error!(device_id = %device_id, error = %e, "failed to persist chat message");
                return;
            }
        };
        counter!(CHAT_MESSAGES_TOTAL).increment(1);

        // Same-device echo only. The session may have vanished while the
        // append was in flight — skip silently.
        let Some(connection) = self.registry.lookup(device_id.as_str()).await else {
            debug!(device_id = %device_id, "session gone before chat echo");
            return;
        };

        let mut echo = event;
        if let Some(obj) = echo.as_object_mut() {
            let _ = obj.insert("timestamp".to_string(), Value::from(record.created_at));
        }
        if !connection.send_value(&echo) {
            warn!(device_id = %device_id, "failed to queue chat echo");
        }
    }

    /// Stateless confirmation: reply `subscribed` to the requester only.
    /// No membership state is kept; any channel name is accepted.
    async fn handle_subscribe(&self, device_id: &DeviceId, event: &Value) {
        let Some(channel) = event.get("channel").and_then(Value::as_str) else {
            warn!(device_id = %device_id, "dropping subscribe frame without string channel");
            counter!(FRAMES_DROPPED_TOTAL, "reason" => "malformed").increment(1);
            return;
        };

        let Some(connection) = self.registry.lookup(device_id.as_str()).await else {
            debug!(device_id = %device_id, "session gone before subscribe confirmation");
            return;
        };
        let confirmation = ServerEvent::Subscribed {
            channel: channel.to_string(),
        };
        if !connection.send_event(&confirmation) {
            warn!(device_id = %device_id, "failed to queue subscribe confirmation");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
