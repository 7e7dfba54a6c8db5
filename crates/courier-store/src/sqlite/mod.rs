//! `SQLite` plumbing: pool construction, migrations, repositories.

pub mod connection;
pub mod migrations;
pub mod repositories;
