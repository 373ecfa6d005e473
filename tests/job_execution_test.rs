//! Integration tests for the job execution state machine.
//!
//! These tests validate:
//! 1. Exactly one terminal disposition is committed per invocation
//! 2. Failures are trapped and converted into retries with backoff
//! 3. Early resolution (finish / retry / destroy) short-circuits the
//!    finalizer
//! 4. The error notifier is best-effort and cannot break retry scheduling
//! 5. The enqueue contract resolves settings and supports synchronous mode

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use jobline::core::{
    AppResult, EnqueueOptions, Enqueued, ErrorNotifier, JobBackend, JobExecution, JobHandler,
    JobRegistry, JobRow, JobSettings, JobState, JobType, RetryInterval,
};
use jobline::infra::backend::memory::InMemoryBackend;

struct SucceedingJob;

impl JobHandler for SucceedingJob {
    fn run(&self, _exec: &mut JobExecution<'_>, _args: &[Value]) -> AppResult<()> {
        Ok(())
    }
}

struct FailingJob;

impl JobHandler for FailingJob {
    fn run(&self, _exec: &mut JobExecution<'_>, _args: &[Value]) -> AppResult<()> {
        Err(anyhow::anyhow!("charge declined"))
    }
}

struct PanickingJob;

impl JobHandler for PanickingJob {
    fn run(&self, _exec: &mut JobExecution<'_>, _args: &[Value]) -> AppResult<()> {
        panic!("gateway wedged")
    }
}

struct DestroyingJob;

impl JobHandler for DestroyingJob {
    fn run(&self, exec: &mut JobExecution<'_>, _args: &[Value]) -> AppResult<()> {
        exec.destroy()?;
        Ok(())
    }
}

struct FinishingJob;

impl JobHandler for FinishingJob {
    fn run(&self, exec: &mut JobExecution<'_>, _args: &[Value]) -> AppResult<()> {
        exec.finish()?;
        Ok(())
    }
}

struct RequeueingJob;

impl JobHandler for RequeueingJob {
    fn run(&self, exec: &mut JobExecution<'_>, _args: &[Value]) -> AppResult<()> {
        exec.retry_in(Duration::from_secs(60))?;
        Ok(())
    }
}

struct CountingJob {
    runs: Arc<AtomicUsize>,
}

impl JobHandler for CountingJob {
    fn run(&self, _exec: &mut JobExecution<'_>, _args: &[Value]) -> AppResult<()> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

struct ArgRecordingJob {
    seen: Arc<Mutex<Vec<Value>>>,
}

impl JobHandler for ArgRecordingJob {
    fn run(&self, _exec: &mut JobExecution<'_>, args: &[Value]) -> AppResult<()> {
        *self.seen.lock().unwrap() = args.to_vec();
        Ok(())
    }
}

struct RecordingNotifier {
    seen: Arc<Mutex<Vec<(String, i64)>>>,
}

impl ErrorNotifier for RecordingNotifier {
    fn notify(&self, error: &anyhow::Error, job: &JobRow) {
        self.seen.lock().unwrap().push((error.to_string(), job.id));
    }
}

struct PanickingNotifier;

impl ErrorNotifier for PanickingNotifier {
    fn notify(&self, _error: &anyhow::Error, _job: &JobRow) {
        panic!("pager service down")
    }
}

fn job_type(handler: Arc<dyn JobHandler>) -> JobType {
    JobType::new("TestJob", handler, &JobSettings::default())
}

fn insert(backend: &InMemoryBackend) -> JobRow {
    backend
        .insert_job("", 100, 0, "TestJob", &[])
        .unwrap()
}

#[test]
fn test_success_commits_finish_exactly_once() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);

    let state = job_type(Arc::new(SucceedingJob)).execute(&mut row, &backend, None);

    assert_eq!(state, JobState::Finished);
    assert_eq!(backend.finished_ids(), vec![row.id]);
    assert!(backend.job(row.id).is_none());
    assert_eq!(row.error_count, 0);
}

#[test]
fn test_failure_schedules_retry_with_default_backoff() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);

    let state = job_type(Arc::new(FailingJob)).execute(&mut row, &backend, None);

    assert_eq!(state, JobState::Retrying);
    assert_eq!(row.error_count, 1);
    // 1^4 + 3 seconds.
    let stored = backend.error_for(row.id).unwrap();
    assert_eq!(stored.wait, Duration::from_secs(4));
    assert!(stored.message.contains("charge declined"));
    // The finalizer was a no-op: no finish commit happened.
    assert!(backend.finished_ids().is_empty());
    assert_eq!(backend.job(row.id).unwrap().error_count, 1);
}

#[test]
fn test_second_failure_grows_backoff() {
    let backend = InMemoryBackend::new();
    let jt = job_type(Arc::new(FailingJob));

    let mut row = insert(&backend);
    jt.execute(&mut row, &backend, None);

    // Simulate the worker fetching the row again for the next attempt.
    let mut row = backend.job(row.id).unwrap();
    jt.execute(&mut row, &backend, None);

    // 2^4 + 3 seconds.
    assert_eq!(row.error_count, 2);
    let stored = backend.error_for(row.id).unwrap();
    assert_eq!(stored.wait, Duration::from_secs(19));
}

#[test]
fn test_fixed_retry_interval_override() {
    let backend = InMemoryBackend::new();
    let settings = JobSettings {
        retry_interval: Some(RetryInterval::Fixed(Duration::from_secs(300))),
        ..JobSettings::default()
    };
    let jt = JobType::new("TestJob", Arc::new(FailingJob), &settings);

    let mut row = insert(&backend);
    let state = jt.execute(&mut row, &backend, None);

    assert_eq!(state, JobState::Retrying);
    assert_eq!(
        backend.error_for(row.id).unwrap().wait,
        Duration::from_secs(300)
    );
}

#[test]
fn test_panic_is_trapped_and_retried() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);

    let state = job_type(Arc::new(PanickingJob)).execute(&mut row, &backend, None);

    assert_eq!(state, JobState::Retrying);
    assert_eq!(row.error_count, 1);
    let stored = backend.error_for(row.id).unwrap();
    assert!(stored.message.contains("gateway wedged"));
}

#[test]
fn test_explicit_destroy_short_circuits_finalizer() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);

    let state = job_type(Arc::new(DestroyingJob)).execute(&mut row, &backend, None);

    assert_eq!(state, JobState::Destroyed);
    assert_eq!(backend.destroyed_ids(), vec![row.id]);
    // No finish commit after the explicit resolution.
    assert!(backend.finished_ids().is_empty());
}

#[test]
fn test_explicit_finish_is_not_repeated_by_finalizer() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);

    let state = job_type(Arc::new(FinishingJob)).execute(&mut row, &backend, None);

    assert_eq!(state, JobState::Finished);
    // One commit from the handler, none from the finalizer.
    assert_eq!(backend.finished_ids(), vec![row.id]);
}

#[test]
fn test_explicit_retry_does_not_count_as_failure() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);

    let state = job_type(Arc::new(RequeueingJob)).execute(&mut row, &backend, None);

    assert_eq!(state, JobState::Retrying);
    // The wrapper did not bump the in-memory count; this was a reschedule.
    assert_eq!(row.error_count, 0);
    assert_eq!(
        backend.error_for(row.id).unwrap().wait,
        Duration::from_secs(60)
    );
    assert!(backend.finished_ids().is_empty());
}

#[test]
fn test_notifier_receives_error_and_job() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let notifier = RecordingNotifier {
        seen: Arc::clone(&seen),
    };

    job_type(Arc::new(FailingJob)).execute(&mut row, &backend, Some(&notifier));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.contains("charge declined"));
    assert_eq!(seen[0].1, row.id);
}

#[test]
fn test_panicking_notifier_does_not_break_retry() {
    let backend = InMemoryBackend::new();
    let mut row = insert(&backend);

    let state =
        job_type(Arc::new(FailingJob)).execute(&mut row, &backend, Some(&PanickingNotifier));

    // The retry was committed before the hook ran, and the hook's panic was
    // swallowed.
    assert_eq!(state, JobState::Retrying);
    assert!(backend.error_for(row.id).is_some());
}

#[test]
fn test_enqueue_uses_resolved_settings() {
    let backend = InMemoryBackend::new();
    let settings = JobSettings {
        queue: Some("mail".into()),
        priority: Some(3),
        ..JobSettings::default()
    };
    let jt = JobType::new("SendReceipt", Arc::new(SucceedingJob), &settings);

    let enqueued = jt
        .enqueue(&backend, vec![json!(42)], EnqueueOptions::default())
        .unwrap();

    let Enqueued::Queued(row) = enqueued else {
        panic!("expected a persisted row");
    };
    assert_eq!(row.queue, "mail");
    assert_eq!(row.priority, 3);
    assert_eq!(row.job_class, "SendReceipt");
    assert_eq!(row.args, vec![json!(42)]);
    assert!(backend.job(row.id).is_some());
}

#[test]
fn test_enqueue_overrides_take_precedence() {
    let backend = InMemoryBackend::new();
    let settings = JobSettings {
        queue: Some("mail".into()),
        priority: Some(3),
        ..JobSettings::default()
    };
    let jt = JobType::new("SendReceipt", Arc::new(SucceedingJob), &settings);

    let opts = EnqueueOptions {
        queue: Some("urgent".into()),
        priority: Some(1),
        run_at_ms: Some(9_999_999),
        job_class: Some("SendReceiptV2".into()),
    };
    let Enqueued::Queued(row) = jt.enqueue(&backend, vec![], opts).unwrap() else {
        panic!("expected a persisted row");
    };

    assert_eq!(row.queue, "urgent");
    assert_eq!(row.priority, 1);
    assert_eq!(row.run_at_ms, 9_999_999);
    assert_eq!(row.job_class, "SendReceiptV2");
}

#[test]
fn test_synchronous_enqueue_runs_in_process() {
    let backend = InMemoryBackend::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let settings = JobSettings {
        run_synchronously: Some(true),
        ..JobSettings::default()
    };
    let jt = JobType::new(
        "TestJob",
        Arc::new(CountingJob {
            runs: Arc::clone(&runs),
        }),
        &settings,
    );

    let enqueued = jt
        .enqueue(&backend, vec![], EnqueueOptions::default())
        .unwrap();

    let Enqueued::Ran { state, .. } = enqueued else {
        panic!("expected in-process execution");
    };
    assert_eq!(state, JobState::Finished);
    assert_eq!(runs.load(Ordering::Relaxed), 1);
    // Nothing touched storage.
    assert!(backend.is_empty());
    assert!(backend.finished_ids().is_empty());
}

#[test]
fn test_synchronous_enqueue_round_trips_args() {
    let backend = InMemoryBackend::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let settings = JobSettings {
        run_synchronously: Some(true),
        ..JobSettings::default()
    };
    let jt = JobType::new(
        "TestJob",
        Arc::new(ArgRecordingJob {
            seen: Arc::clone(&seen),
        }),
        &settings,
    );

    let args = vec![json!("receipt-7"), json!(12.5), json!({"resend": true})];
    jt.enqueue(&backend, args.clone(), EnqueueOptions::default())
        .unwrap();

    // In-process execution saw the storage representation of the args.
    assert_eq!(*seen.lock().unwrap(), args);
}

#[test]
fn test_scheduled_job_is_persisted_even_in_sync_mode() {
    let backend = InMemoryBackend::new();
    let settings = JobSettings {
        run_synchronously: Some(true),
        ..JobSettings::default()
    };
    let jt = JobType::new("TestJob", Arc::new(SucceedingJob), &settings);

    // An explicit future run time forces persistence.
    let opts = EnqueueOptions {
        run_at_ms: Some(9_999_999),
        ..EnqueueOptions::default()
    };
    let enqueued = jt.enqueue(&backend, vec![], opts).unwrap();

    assert!(matches!(enqueued, Enqueued::Queued(_)));
    assert_eq!(backend.len(), 1);
}

#[test]
fn test_registry_maps_class_names_to_types() {
    let mut registry = JobRegistry::new();
    assert!(registry.is_empty());

    registry.register(job_type(Arc::new(SucceedingJob)));
    assert_eq!(registry.len(), 1);

    let jt = registry.get("TestJob").unwrap();
    assert_eq!(jt.name(), "TestJob");
    assert!(registry.get("UnknownJob").is_none());
}
