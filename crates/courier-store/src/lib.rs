//! # courier-store
//!
//! Durable per-identity chat history for the Courier relay, backed by
//! `SQLite` behind an `r2d2` connection pool.
//!
//! The server depends on the [`HistoryStore`] trait, not on `SQLite`:
//! two operations, `append(identity, content)` and `read_all(identity)`.
//! An unknown identity reads as an empty history, never as an error —
//! the store does not distinguish "never seen" from "seen, zero messages".
//!
//! ## Layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `store` | [`HistoryStore`] trait + [`SqliteHistory`] implementation |
//! | `sqlite::connection` | Pool construction, pragmas |
//! | `sqlite::migrations` | `user_version`-tracked schema migrations |
//! | `sqlite::repositories` | Stateless row-level repositories |

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use sqlite::connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use store::{HistoryStore, SqliteHistory};
