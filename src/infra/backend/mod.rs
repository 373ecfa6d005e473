//! Persistence backend adapters.
//!
//! The core only speaks [`crate::core::JobBackend`]; these adapters exist
//! for development, testing, and the synchronous execution path. A durable
//! backend (e.g. Postgres) lives outside this crate.

pub mod memory;
pub mod null;
