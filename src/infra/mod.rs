//! Infrastructure adapters for job persistence backends.

pub mod backend;
