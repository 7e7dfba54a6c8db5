//! # courier-server
//!
//! Axum HTTP + WebSocket relay server.
//!
//! Clients connect to `/ws`, are assigned a stable device identity, and
//! exchange typed JSON events. The server persists each identity's chat
//! history and replays it on connect. See the `websocket` module for the
//! session registry, message router, and broadcast fan-out.

#![deny(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod routes;
pub mod websocket;

pub use config::ServerConfig;
pub use routes::{AppState, app};
