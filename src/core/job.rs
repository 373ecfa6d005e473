//! Job execution state machine.
//!
//! Wraps one invocation of a user-supplied work function: runs it with the
//! job's stored arguments, traps anything it throws, schedules a retry with
//! backoff on failure, and guarantees exactly one terminal disposition
//! (finish, retry, or destroy) is committed to storage per run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::core::error::{AppResult, CoreError};
use crate::core::settings::RetryInterval;

/// Authoritative job fields as fetched from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRow {
    /// Job identifier, globally unique.
    pub id: i64,
    /// Queue name the job belongs to.
    pub queue: String,
    /// Urgency class; lower values are more urgent.
    pub priority: i32,
    /// Scheduled run time in milliseconds since the Unix epoch.
    pub run_at_ms: i64,
    /// Name tag identifying the registered job type.
    pub job_class: String,
    /// Positional arguments passed to the work function.
    pub args: Vec<Value>,
    /// Number of caught execution failures so far.
    pub error_count: i32,
}

/// Persistence interface the execution core commits outcomes through.
///
/// Implementations are assumed externally synchronized; the core never calls
/// the same backend concurrently for one job invocation.
pub trait JobBackend: Send + Sync {
    /// Persist a new job row and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Backend` when the row cannot be persisted.
    fn insert_job(
        &self,
        queue: &str,
        priority: i32,
        run_at_ms: i64,
        job_class: &str,
        args: &[Value],
    ) -> Result<JobRow, CoreError>;

    /// Commit terminal success for the job.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Backend` when the commit fails.
    fn finish_job(&self, id: i64) -> Result<(), CoreError>;

    /// Commit a scheduled retry: the job runs again `wait` from now, with
    /// the failure's message recorded.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Backend` when the commit fails.
    fn set_error(&self, wait: Duration, message: &str, id: i64) -> Result<(), CoreError>;

    /// Delete the job row outright.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Backend` when the deletion fails.
    fn destroy_job(&self, id: i64) -> Result<(), CoreError>;
}

/// Best-effort hook invoked with a job failure and the job's attributes.
///
/// Failures the hook itself raises are trapped and discarded; they are
/// deliberately unobservable to the caller and never displace the original
/// failure's retry scheduling.
pub trait ErrorNotifier: Send + Sync {
    /// Report a caught job failure.
    fn notify(&self, error: &anyhow::Error, job: &JobRow);
}

/// Lifecycle position of one job invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Constructed, work not started.
    Pending,
    /// Work function running.
    Running,
    /// Terminal success committed.
    Finished,
    /// Failure caught, retry committed.
    Retrying,
    /// Job row deleted at the handler's request.
    Destroyed,
    /// Work returned without throwing or resolving; the guaranteed
    /// finalizer converts this to `Finished`.
    UnresolvedError,
}

/// User-supplied unit of work.
pub trait JobHandler: Send + Sync {
    /// Run the job with its stored arguments.
    ///
    /// Returning `Err` counts as a thrown failure: it is trapped, the job's
    /// `error_count` is bumped, and a retry is scheduled. The handler may
    /// instead resolve the job early through `exec`.
    ///
    /// # Errors
    ///
    /// Any error is caught by the execution wrapper; it never propagates to
    /// the worker.
    fn run(&self, exec: &mut JobExecution<'_>, args: &[Value]) -> AppResult<()>;
}

/// Mutable context handed to a handler, exposing early resolution.
///
/// Each early-resolution method commits its outcome immediately and marks
/// the invocation resolved, turning the default finish finalizer into a
/// no-op.
pub struct JobExecution<'a> {
    row: &'a mut JobRow,
    backend: &'a dyn JobBackend,
    state: JobState,
    resolved: bool,
}

impl<'a> JobExecution<'a> {
    fn new(row: &'a mut JobRow, backend: &'a dyn JobBackend) -> Self {
        Self {
            row,
            backend,
            state: JobState::Pending,
            resolved: false,
        }
    }

    /// The job under execution.
    #[must_use]
    pub fn row(&self) -> &JobRow {
        self.row
    }

    /// Current lifecycle position.
    #[must_use]
    pub const fn state(&self) -> JobState {
        self.state
    }

    /// True once a terminal outcome has been committed.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Commit terminal success now, short-circuiting the finalizer.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure; the invocation still counts as
    /// resolved, so no second commit is attempted.
    pub fn finish(&mut self) -> AppResult<()> {
        self.resolved = true;
        self.state = JobState::Finished;
        self.backend.finish_job(self.row.id)?;
        Ok(())
    }

    /// Commit a retry after an explicit wait, short-circuiting the
    /// finalizer. The job's `error_count` is not incremented; this is a
    /// reschedule, not a failure.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure; the invocation still counts as
    /// resolved.
    pub fn retry_in(&mut self, wait: Duration) -> AppResult<()> {
        self.resolved = true;
        self.state = JobState::Retrying;
        self.backend
            .set_error(wait, "retry requested by handler", self.row.id)?;
        Ok(())
    }

    /// Delete the job row outright, short-circuiting the finalizer.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure; the invocation still counts as
    /// resolved.
    pub fn destroy(&mut self) -> AppResult<()> {
        self.resolved = true;
        self.state = JobState::Destroyed;
        self.backend.destroy_job(self.row.id)?;
        Ok(())
    }
}

/// Execute one job invocation through the full state machine.
///
/// Runs `handler` with the row's arguments, trapping both returned errors
/// and panics. On failure the row's `error_count` is incremented, a retry is
/// committed with the wait computed by `retry`, and `notifier` (if any) is
/// invoked best-effort. If the handler returns without resolving, terminal
/// success is committed by the finalizer. Exactly one terminal commit is
/// made per invocation; backend failures during commits are logged and never
/// propagate.
pub fn execute_job(
    handler: &dyn JobHandler,
    retry: &RetryInterval,
    row: &mut JobRow,
    backend: &dyn JobBackend,
    notifier: Option<&dyn ErrorNotifier>,
) -> JobState {
    let args = row.args.clone();
    let mut exec = JobExecution::new(row, backend);
    exec.state = JobState::Running;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.run(&mut exec, &args)));

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(payload) => Some(anyhow::anyhow!(
            "job panicked: {}",
            panic_message(payload.as_ref())
        )),
    };

    if let Some(err) = failure {
        if exec.resolved {
            // An error escaped the handler after the outcome was already
            // committed (e.g. a backend failure from an early resolution).
            warn!(
                job_id = exec.row.id,
                error = %err,
                "error after job already resolved"
            );
        } else {
            exec.row.error_count += 1;
            let wait = retry.wait_for(exec.row.error_count);
            if let Err(commit_err) = exec
                .backend
                .set_error(wait, &format!("{err:#}"), exec.row.id)
            {
                error!(
                    job_id = exec.row.id,
                    error = %commit_err,
                    "failed to commit retry"
                );
            }
            exec.resolved = true;
            exec.state = JobState::Retrying;
            warn!(
                job_id = exec.row.id,
                error_count = exec.row.error_count,
                wait_secs = wait.as_secs(),
                error = %err,
                "job failed, retry scheduled"
            );
        }

        if let Some(hook) = notifier {
            // Hook failures are deliberately unobservable.
            let row_ref: &JobRow = exec.row;
            let _ = panic::catch_unwind(AssertUnwindSafe(|| hook.notify(&err, row_ref)));
        }
    } else if !exec.resolved {
        exec.state = JobState::UnresolvedError;
    }

    // Guaranteed finalizer: commit the default outcome unless one was
    // already committed on some path above.
    if !exec.resolved {
        if let Err(commit_err) = exec.backend.finish_job(exec.row.id) {
            error!(
                job_id = exec.row.id,
                error = %commit_err,
                "failed to commit finish"
            );
        }
        exec.resolved = true;
        exec.state = JobState::Finished;
    }

    exec.state
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
