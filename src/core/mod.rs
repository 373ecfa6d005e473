//! Core coordination: sort keys, the bounded priority queue, and the job
//! execution state machine.

pub mod error;
pub mod job;
pub mod job_type;
pub mod queue;
pub mod settings;
pub mod sort_key;

pub use error::{AppResult, CoreError};
pub use job::{
    execute_job, ErrorNotifier, JobBackend, JobExecution, JobHandler, JobRow, JobState,
};
pub use job_type::{EnqueueOptions, Enqueued, JobRegistry, JobType};
pub use queue::JobQueue;
pub use settings::{
    JobSettings, ResolvedSettings, RetryInterval, DEFAULT_PRIORITY, DEFAULT_QUEUE,
};
pub use sort_key::SortKey;
