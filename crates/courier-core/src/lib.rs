//! # courier-core
//!
//! Foundation types for the Courier relay.
//!
//! This crate provides the shared vocabulary the other Courier crates depend on:
//!
//! - **Device identity**: [`ids::DeviceId`] newtype with prefixed uuid-v7 generation
//! - **Wire events**: [`events::ServerEvent`] for structured outbound frames,
//!   [`events::ChatRecord`] for persisted history, and `serde_json::Value`
//!   helpers for the untyped inbound path
//! - **Logging**: [`logging::init`] installs the process-wide tracing subscriber
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `courier-store` and `courier-server`.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
