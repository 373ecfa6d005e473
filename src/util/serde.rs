//! Argument codec shared by storage adapters and synchronous execution.
//!
//! The synchronous enqueue path round-trips arguments through this codec so
//! in-process execution observes the same value coercions as arguments that
//! would have passed through storage.

use serde_json::Value;

use crate::core::error::CoreError;

/// Serialize job arguments to their storage representation.
///
/// # Errors
///
/// Returns `CoreError::Serialization` if encoding fails.
pub fn serialize_args(args: &[Value]) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec(args).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Deserialize job arguments from their storage representation.
///
/// # Errors
///
/// Returns `CoreError::Serialization` if decoding fails.
pub fn deserialize_args(bytes: &[u8]) -> Result<Vec<Value>, CoreError> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
}
