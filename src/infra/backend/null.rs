//! No-op backend used by synchronous execution mode.

use std::time::Duration;

use serde_json::Value;

use crate::core::{CoreError, JobBackend, JobRow};

/// Backend that accepts every commit and persists nothing.
///
/// Synchronous enqueue runs the handler against this backend so terminal
/// commits for a row that was never persisted do not reach storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl JobBackend for NullBackend {
    fn insert_job(
        &self,
        queue: &str,
        priority: i32,
        run_at_ms: i64,
        job_class: &str,
        args: &[Value],
    ) -> Result<JobRow, CoreError> {
        Ok(JobRow {
            id: 0,
            queue: queue.to_string(),
            priority,
            run_at_ms,
            job_class: job_class.to_string(),
            args: args.to_vec(),
            error_count: 0,
        })
    }

    fn finish_job(&self, _id: i64) -> Result<(), CoreError> {
        Ok(())
    }

    fn set_error(&self, _wait: Duration, _message: &str, _id: i64) -> Result<(), CoreError> {
        Ok(())
    }

    fn destroy_job(&self, _id: i64) -> Result<(), CoreError> {
        Ok(())
    }
}
