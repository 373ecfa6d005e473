//! Job type registration and the enqueue contract.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::core::error::CoreError;
use crate::core::job::{execute_job, ErrorNotifier, JobBackend, JobHandler, JobRow, JobState};
use crate::core::settings::{JobSettings, ResolvedSettings};
use crate::infra::backend::null::NullBackend;
use crate::util::clock::now_ms;
use crate::util::serde::{deserialize_args, serialize_args};

/// Per-call overrides for a single enqueue. Unset fields fall back to the
/// job type's resolved settings.
#[derive(Debug, Default, Clone)]
pub struct EnqueueOptions {
    /// Queue name override.
    pub queue: Option<String>,
    /// Priority override.
    pub priority: Option<i32>,
    /// Scheduled run time override, milliseconds since the Unix epoch.
    pub run_at_ms: Option<i64>,
    /// Job class tag override.
    pub job_class: Option<String>,
}

/// Outcome of an enqueue call.
#[derive(Debug)]
pub enum Enqueued {
    /// A row was persisted through the backend.
    Queued(JobRow),
    /// The job ran in-process (synchronous mode); no row was persisted.
    Ran {
        /// The ephemeral row the job ran with.
        row: JobRow,
        /// Terminal state of the in-process run.
        state: JobState,
    },
}

/// A registered job type: the work function plus settings resolved through
/// the ancestor chain at registration time.
pub struct JobType {
    name: String,
    handler: Arc<dyn JobHandler>,
    settings: ResolvedSettings,
}

impl JobType {
    /// Register a job type, resolving `settings` through its ancestor chain
    /// now rather than on each call.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        handler: Arc<dyn JobHandler>,
        settings: &JobSettings,
    ) -> Self {
        Self {
            name: name.into(),
            handler,
            settings: settings.resolve(),
        }
    }

    /// Name tag stored in `job_class` for jobs of this type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings resolved at registration.
    #[must_use]
    pub const fn settings(&self) -> &ResolvedSettings {
        &self.settings
    }

    /// Enqueue a job of this type.
    ///
    /// Each unset override resolves through the registered settings, then
    /// library defaults. If the resolved run time is immediate (unset) and
    /// the type runs synchronously, the arguments are round-tripped through
    /// the storage codec and the work function executes in-process against a
    /// no-op backend instead of persisting a row. Otherwise the row is
    /// persisted and returned.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Serialization` if the argument round-trip fails,
    /// or the backend's error if the insert fails.
    pub fn enqueue(
        &self,
        backend: &dyn JobBackend,
        args: Vec<Value>,
        opts: EnqueueOptions,
    ) -> Result<Enqueued, CoreError> {
        let queue = opts.queue.unwrap_or_else(|| self.settings.queue.clone());
        let priority = opts.priority.unwrap_or(self.settings.priority);
        let run_at_ms = opts.run_at_ms.or(self.settings.run_at_ms);
        let job_class = opts.job_class.unwrap_or_else(|| self.name.clone());

        if run_at_ms.is_none() && self.settings.run_synchronously {
            // Round-trip the arguments so in-process execution observes the
            // same representation as arguments fetched back from storage.
            let bytes = serialize_args(&args)?;
            let args = deserialize_args(&bytes)?;
            let mut row = JobRow {
                id: 0,
                queue,
                priority,
                run_at_ms: now_ms(),
                job_class,
                args,
                error_count: 0,
            };
            debug!(job_class = %row.job_class, "running job synchronously");
            let state = execute_job(
                self.handler.as_ref(),
                &self.settings.retry_interval,
                &mut row,
                &NullBackend,
                None,
            );
            return Ok(Enqueued::Ran { row, state });
        }

        let row = backend.insert_job(
            &queue,
            priority,
            run_at_ms.unwrap_or_else(now_ms),
            &job_class,
            &args,
        )?;
        debug!(job_id = row.id, job_class = %row.job_class, "job enqueued");
        Ok(Enqueued::Queued(row))
    }

    /// Execute a fetched row through the state machine with this type's
    /// retry policy.
    pub fn execute(
        &self,
        row: &mut JobRow,
        backend: &dyn JobBackend,
        notifier: Option<&dyn ErrorNotifier>,
    ) -> JobState {
        execute_job(
            self.handler.as_ref(),
            &self.settings.retry_interval,
            row,
            backend,
            notifier,
        )
    }
}

/// Name to job type map, consulted by the worker loop to find the handler
/// behind a row's `job_class` tag.
#[derive(Default)]
pub struct JobRegistry {
    types: HashMap<String, Arc<JobType>>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job type under its name, returning the shared handle.
    /// Re-registering a name replaces the previous type.
    pub fn register(&mut self, job_type: JobType) -> Arc<JobType> {
        let shared = Arc::new(job_type);
        self.types.insert(shared.name().to_string(), Arc::clone(&shared));
        shared
    }

    /// Look up a job type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<JobType>> {
        self.types.get(name).cloned()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
