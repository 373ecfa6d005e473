//! Queue ordering keys.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Ordering tuple identifying a job's position in the queue.
///
/// Keys are lightweight stand-ins for full job rows: the queue holds only
/// these, and a worker fetches the authoritative row from storage after
/// shifting one. The total order is lexicographic over
/// `(priority, run_at_ms, id)`, ascending, so lower `priority` values are
/// dequeued first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Urgency class; lower values are more urgent.
    pub priority: i32,
    /// Scheduled run time in milliseconds since the Unix epoch.
    pub run_at_ms: i64,
    /// Job identifier, globally unique across the system.
    pub id: i64,
}

impl SortKey {
    /// Returns true iff `self` sorts strictly before `other` under the
    /// `(priority, run_at_ms, id)` tuple order.
    ///
    /// # Panics
    ///
    /// Panics if the two keys are equal on all three fields. Job ids are
    /// globally unique, so a full-tuple tie means the queue was handed the
    /// same live job twice. That is a data-integrity bug upstream, not a
    /// recoverable runtime condition.
    #[must_use]
    pub fn sorts_before(&self, other: &Self) -> bool {
        let lhs = (self.priority, self.run_at_ms, self.id);
        let rhs = (other.priority, other.run_at_ms, other.id);
        match lhs.cmp(&rhs) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => panic!(
                "sort keys compared equal (priority={}, run_at_ms={}, id={}): job ids must be unique",
                self.priority, self.run_at_ms, self.id
            ),
        }
    }
}
