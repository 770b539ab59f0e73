//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that reads reactive values and must be
//! re-run when they change. Watchers are the only subscribers the engine
//! creates, but the registry and scheduler only ever see this trait.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::DepId;

/// Unique, creation-ordered identifier for a watcher.
///
/// Ids only ever increase, so sorting by id sorts by creation order. The
/// scheduler relies on this to run parents before children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    /// Generate a new unique watcher ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A computation that depends on reactive values.
pub trait Subscriber {
    /// The subscriber's creation-ordered id.
    fn id(&self) -> WatcherId;

    /// Human-readable label used in warnings and error reports.
    fn expression(&self) -> String;

    /// Record that `dep` was read during the current evaluation.
    fn add_dep(&self, dep: DepId);

    /// A dependency changed.
    fn update(&self);

    /// Re-evaluate now. Called by the scheduler during a flush.
    fn run(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watcher_ids_are_unique() {
        let id1 = WatcherId::new();
        let id2 = WatcherId::new();
        let id3 = WatcherId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn watcher_ids_follow_creation_order() {
        let first = WatcherId::new();
        let second = WatcherId::new();
        assert!(first < second);
        assert!(first.raw() < second.raw());
    }
}
