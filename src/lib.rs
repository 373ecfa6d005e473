//! # Jobline
//!
//! The in-process coordination core of a background job-processing library.
//!
//! Jobline sits between a producer that discovers ready jobs in durable
//! storage and the worker threads that execute them. It provides the two
//! pieces that actually need care: a bounded, priority-ordered, thread-safe
//! queue with blocking dequeue and backpressure, and the per-job execution
//! state machine that traps failures, schedules retries with backoff, and
//! guarantees exactly one terminal disposition per run.
//!
//! ## Core Problem Solved
//!
//! Background job systems put all their concurrency in one place: a shared
//! in-memory queue that many producer and worker threads touch at once.
//!
//! - **Strict ordering**: workers must always receive the most urgent job
//! - **Backpressure**: the queue holds lightweight sort keys, never payloads,
//!   and evicts from the low-priority end when capacity is exceeded
//! - **Blocking dequeue**: idle workers sleep on a condition variable and are
//!   woken by pushes, never by polling
//! - **Fault isolation**: a failing job is rescheduled with growing backoff;
//!   it never takes the worker down with it
//!
//! ## JobQueue - Bounded Priority Queue
//!
//! ```rust,ignore
//! use jobline::core::{JobQueue, SortKey};
//!
//! let queue = JobQueue::new(8)?;
//!
//! // Producer: offer newly discovered sort keys, release row locks for
//! // anything that was evicted.
//! let evicted = queue.push([SortKey { priority: 10, run_at_ms: now, id: 1 }]);
//!
//! // Worker: block until a job at or above the wanted urgency is available.
//! while let Some(key) = queue.shift(i32::MAX) {
//!     // fetch the full row behind `key` and execute it
//! }
//! ```
//!
//! ## Job Execution State Machine
//!
//! ```rust,ignore
//! use jobline::core::{JobHandler, JobSettings, JobType};
//! use std::sync::Arc;
//!
//! let job_type = JobType::new("SendReceipt", Arc::new(SendReceipt), &JobSettings::default());
//!
//! // Worker loop: fetch the row behind a shifted key, then execute. Failures
//! // are trapped, error_count is bumped, and a retry is committed to storage.
//! let state = job_type.execute(&mut row, &backend, None);
//! ```
//!
//! For complete examples, see:
//! - `tests/job_queue_test.rs` - concurrent queue integration tests
//! - `tests/job_execution_test.rs` - execution state machine tests

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core coordination: sort keys, the bounded priority queue, and the job
/// execution state machine.
pub mod core;
/// Configuration models for queue capacity and job defaults.
pub mod config;
/// Infrastructure adapters for job persistence backends.
pub mod infra;
/// Shared utilities.
pub mod util;
