//! Stateless row-level repositories. Every method takes `&Connection`.

pub mod message;
