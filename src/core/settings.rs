//! Per-type job settings resolved through an explicit fallback chain.
//!
//! Each job type carries optional overrides plus a link to an ancestor
//! settings object. Lookups walk the chain (own override, then nearest
//! ancestor's, then the library default) and are resolved once, when the
//! job type is registered, rather than on every call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Library-wide default queue name.
pub const DEFAULT_QUEUE: &str = "";
/// Library-wide default priority; lower values are more urgent.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Backoff policy consulted on each caught job failure.
#[derive(Clone)]
pub enum RetryInterval {
    /// Fixed wait regardless of how often the job has failed.
    Fixed(Duration),
    /// Wait computed from the job's cumulative error count.
    FromErrorCount(Arc<dyn Fn(i32) -> Duration + Send + Sync>),
}

impl RetryInterval {
    /// Wait before the next attempt for a job that has now failed
    /// `error_count` times.
    #[must_use]
    pub fn wait_for(&self, error_count: i32) -> Duration {
        match self {
            Self::Fixed(wait) => *wait,
            Self::FromErrorCount(f) => f(error_count),
        }
    }

    /// Library default backoff: `error_count^4 + 3` seconds, saturating.
    #[must_use]
    pub fn default_wait(error_count: i32) -> Duration {
        let count = u64::from(error_count.unsigned_abs());
        Duration::from_secs(count.saturating_pow(4).saturating_add(3))
    }
}

impl Default for RetryInterval {
    fn default() -> Self {
        Self::FromErrorCount(Arc::new(|error_count| Self::default_wait(error_count)))
    }
}

impl fmt::Debug for RetryInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(wait) => f.debug_tuple("Fixed").field(wait).finish(),
            Self::FromErrorCount(_) => f.write_str("FromErrorCount(..)"),
        }
    }
}

/// Optional per-type overrides with an ancestor link.
///
/// Unset fields fall through to the parent chain; a field unset along the
/// whole chain resolves to the library default.
#[derive(Debug, Default)]
pub struct JobSettings {
    /// Queue name override.
    pub queue: Option<String>,
    /// Priority override.
    pub priority: Option<i32>,
    /// Scheduled run time override, milliseconds since the Unix epoch.
    /// Unset means "immediate".
    pub run_at_ms: Option<i64>,
    /// Retry backoff override.
    pub retry_interval: Option<RetryInterval>,
    /// Run in-process at enqueue time instead of persisting a row.
    pub run_synchronously: Option<bool>,
    /// Ancestor settings consulted for fields unset here.
    pub parent: Option<Arc<JobSettings>>,
}

impl JobSettings {
    /// Attach an ancestor to consult for unset fields.
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<Self>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Walk the chain for the first set value.
    fn lookup<T>(&self, get: impl Fn(&Self) -> Option<T>) -> Option<T> {
        let mut node = Some(self);
        while let Some(settings) = node {
            if let Some(value) = get(settings) {
                return Some(value);
            }
            node = settings.parent.as_deref();
        }
        None
    }

    /// Resolve every field through the chain down to library defaults.
    #[must_use]
    pub fn resolve(&self) -> ResolvedSettings {
        ResolvedSettings {
            queue: self
                .lookup(|s| s.queue.clone())
                .unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
            priority: self.lookup(|s| s.priority).unwrap_or(DEFAULT_PRIORITY),
            run_at_ms: self.lookup(|s| s.run_at_ms),
            retry_interval: self
                .lookup(|s| s.retry_interval.clone())
                .unwrap_or_default(),
            run_synchronously: self.lookup(|s| s.run_synchronously).unwrap_or(false),
        }
    }
}

/// Fully-resolved settings computed at registration time.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Queue name jobs of this type enqueue into.
    pub queue: String,
    /// Priority jobs of this type enqueue with.
    pub priority: i32,
    /// Scheduled run time; `None` means immediate.
    pub run_at_ms: Option<i64>,
    /// Backoff policy for caught failures.
    pub retry_interval: RetryInterval,
    /// Whether enqueue runs the job in-process when the run time is
    /// immediate.
    pub run_synchronously: bool,
}
