//! HTTP surface: WebSocket upgrade, health, metrics, broadcast injection.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use courier_store::HistoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::websocket::broadcast::Broadcaster;
use crate::websocket::dispatch::MessageRouter;
use crate::websocket::handler::ws_upgrade;
use crate::websocket::registry::SessionRegistry;

/// Shared state handed to every request handler.
///
/// `metrics` is `None` when no Prometheus recorder is installed (tests);
/// the `metrics` macros degrade to no-ops in that case and `/metrics`
/// renders empty.
#[derive(Clone)]
pub struct AppState {
    /// Identity → live connection map.
    pub registry: Arc<SessionRegistry>,
    /// Inbound frame router.
    pub router: MessageRouter,
    /// Fan-out for server-side event injection.
    pub broadcaster: Broadcaster,
    /// Handle for rendering `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire up registry, router, and broadcaster over one history store.
    pub fn new(history: Arc<dyn HistoryStore>, metrics: Option<PrometheusHandle>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let router = MessageRouter::new(Arc::clone(&registry), history);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            registry,
            router,
            broadcaster,
            metrics,
        }
    }
}

/// Build the relay router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/broadcast", post(inject_broadcast))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "activeSessions": state.registry.count(),
    }))
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.as_ref().map(PrometheusHandle::render).unwrap_or_default()
}

/// Push one event to every open WebSocket session. The body is relayed
/// as-is; the response reports how many sessions it reached.
async fn inject_broadcast(
    State(state): State<AppState>,
    Json(event): Json<Value>,
) -> impl IntoResponse {
    let delivered = state.broadcaster.broadcast(&event).await;
    Json(json!({ "delivered": delivered }))
}
