//! WebSocket connection management, session registry, message dispatch,
//! and broadcasting.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `handler` | WebSocket upgrade, identity assignment, per-connection loop |
//! | `connection` | Live connection handle: outbound channel, liveness state |
//! | `registry` | Identity → connection map; register/lookup/remove/evict |
//! | `dispatch` | Inbound frame classification and routing |
//! | `broadcast` | Fan-out of one event to every open connection |
//!
//! ## Data Flow
//!
//! `handler` assigns an identity and registers the session → `dispatch`
//! sends the welcome and replays history → each inbound frame runs through
//! `dispatch` (chat persist + echo, subscribe confirm, unknown no-op) →
//! on close, `handler` deregisters. `broadcast` is not used by dispatch;
//! it serves external event sources via `POST /broadcast`.

pub mod broadcast;
pub mod connection;
pub mod dispatch;
pub mod handler;
pub mod registry;
