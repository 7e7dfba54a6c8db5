//! Wire event model.
//!
//! Outbound frames the server originates (`connection`, `history`,
//! `subscribed`) are typed. Inbound frames and chat echoes stay
//! `serde_json::Value`: the echo contract returns the sender's full payload
//! with the server-stamped identity and timestamp added, so arbitrary client
//! fields must round-trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::DeviceId;

/// Inbound event type for chat messages.
pub const EVENT_CHAT: &str = "chat";
/// Inbound event type for subscription requests.
pub const EVENT_SUBSCRIBE: &str = "subscribe";

/// One persisted chat message, tied to a single device identity.
///
/// Ordering is insertion order within an identity; there is no
/// cross-identity ordering guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    /// Record ID (`msg_{uuidv7}`).
    pub id: String,
    /// Owning device identity.
    pub device_id: String,
    /// Message content.
    pub content: String,
    /// RFC-3339 creation timestamp, assigned at append time.
    pub created_at: String,
}

/// Structured server-originated event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Welcome frame sent immediately after registration. Carries the
    /// assigned identity — the client's only way to learn a synthesized ID.
    Connection {
        /// Server-assigned identity.
        device_id: DeviceId,
        /// Human-readable greeting.
        message: String,
    },
    /// One-time history backfill: the full ordered record sequence.
    History {
        /// Persisted records, oldest first.
        messages: Vec<ChatRecord>,
    },
    /// Confirmation reply to a `subscribe` request.
    Subscribed {
        /// Echoed channel name.
        channel: String,
    },
}

/// Overwrite the event's `deviceId` with the server-assigned identity.
///
/// Identity is server-authoritative; any client-supplied value is discarded.
/// Non-object payloads are left untouched (the router rejects them upstream).
pub fn stamp_device_id(event: &mut Value, device_id: &DeviceId) {
    if let Some(obj) = event.as_object_mut() {
        let _ = obj.insert("deviceId".to_string(), Value::from(device_id.as_str()));
    }
}

/// The `type` discriminator of an inbound event, if present and a string.
pub fn event_type(event: &Value) -> Option<&str> {
    event.get("type").and_then(Value::as_str)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
