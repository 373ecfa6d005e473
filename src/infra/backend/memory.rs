//! In-memory backend for development and testing.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::core::{CoreError, JobBackend, JobRow};
use crate::util::clock::now_ms;

/// Error details recorded for a job awaiting retry.
#[derive(Debug, Clone)]
pub struct StoredError {
    /// Message from the failed run.
    pub message: String,
    /// Wait applied before the next attempt.
    pub wait: Duration,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    jobs: HashMap<i64, JobRow>,
    errors: HashMap<i64, StoredError>,
    finished: Vec<i64>,
    destroyed: Vec<i64>,
}

/// Backend keeping job rows in process memory.
///
/// Commits are observable through the accessor methods, which is what the
/// execution state machine's tests assert against.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current copy of a stored row, if it still exists.
    #[must_use]
    pub fn job(&self, id: i64) -> Option<JobRow> {
        self.state.lock().jobs.get(&id).cloned()
    }

    /// Ids committed as finished, in commit order.
    #[must_use]
    pub fn finished_ids(&self) -> Vec<i64> {
        self.state.lock().finished.clone()
    }

    /// Ids destroyed, in commit order.
    #[must_use]
    pub fn destroyed_ids(&self) -> Vec<i64> {
        self.state.lock().destroyed.clone()
    }

    /// Last error recorded for a job, if any.
    #[must_use]
    pub fn error_for(&self, id: i64) -> Option<StoredError> {
        self.state.lock().errors.get(&id).cloned()
    }

    /// Number of live rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// True when no live rows remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().jobs.is_empty()
    }
}

impl JobBackend for InMemoryBackend {
    fn insert_job(
        &self,
        queue: &str,
        priority: i32,
        run_at_ms: i64,
        job_class: &str,
        args: &[Value],
    ) -> Result<JobRow, CoreError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let row = JobRow {
            id: state.next_id,
            queue: queue.to_string(),
            priority,
            run_at_ms,
            job_class: job_class.to_string(),
            args: args.to_vec(),
            error_count: 0,
        };
        state.jobs.insert(row.id, row.clone());
        Ok(row)
    }

    fn finish_job(&self, id: i64) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        state.jobs.remove(&id);
        state.finished.push(id);
        Ok(())
    }

    fn set_error(&self, wait: Duration, message: &str, id: i64) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        let wait_ms = i64::try_from(wait.as_millis()).unwrap_or(i64::MAX);
        if let Some(job) = state.jobs.get_mut(&id) {
            job.error_count += 1;
            job.run_at_ms = now_ms().saturating_add(wait_ms);
        }
        state.errors.insert(
            id,
            StoredError {
                message: message.to_string(),
                wait,
            },
        );
        Ok(())
    }

    fn destroy_job(&self, id: i64) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        state.jobs.remove(&id);
        state.destroyed.push(id);
        Ok(())
    }
}
