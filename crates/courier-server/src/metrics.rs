//! Prometheus metrics recorder and metric-name constants.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket sessions (gauge).
pub const WS_SESSIONS_ACTIVE: &str = "ws_sessions_active";
/// Broadcast payload drops total (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Chat messages persisted total (counter).
pub const CHAT_MESSAGES_TOTAL: &str = "chat_messages_total";
/// History backfills delivered total (counter).
pub const HISTORY_REPLAYS_TOTAL: &str = "history_replays_total";
/// Inbound frames dropped total (counter, labels: reason).
pub const FRAMES_DROPPED_TOTAL: &str = "frames_dropped_total";
/// Idle sessions evicted total (counter).
pub const SESSIONS_EVICTED_TOTAL: &str = "sessions_evicted_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_snake_case() {
        for name in [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_SESSIONS_ACTIVE,
            WS_BROADCAST_DROPS_TOTAL,
            CHAT_MESSAGES_TOTAL,
            HISTORY_REPLAYS_TOTAL,
            FRAMES_DROPPED_TOTAL,
            SESSIONS_EVICTED_TOTAL,
        ] {
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
