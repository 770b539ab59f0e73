//! Dependency Subject
//!
//! A [`Dep`] is the publish side of one observable slot: a reactive property,
//! a tracked cell, or an observed object/array as a whole. Reading the slot
//! inside a watcher calls [`Dep::depend`]; writing it calls [`Dep::notify`].
//!
//! The dep itself only holds an id. Its subscriber set lives in the
//! [`Runtime`] registry and is removed when the dep is dropped together with
//! its owner.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context;
use super::runtime::Runtime;
use super::subscriber::WatcherId;

/// Unique identifier for a dep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    /// Generate a new unique dep ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fan-out notification primitive bound to one observable slot.
pub struct Dep {
    id: DepId,
}

impl Dep {
    /// Create a dep with no subscribers.
    pub fn new() -> Self {
        let id = DepId::new();
        Runtime::create_dep(id);
        Self { id }
    }

    /// Get the dep's unique ID.
    pub fn id(&self) -> DepId {
        self.id
    }

    /// Subscribe a watcher. Already-subscribed watchers are left in place.
    pub fn add_sub(&self, subscriber: WatcherId) {
        Runtime::add_sub(self.id, subscriber);
    }

    /// Unsubscribe a watcher.
    pub fn remove_sub(&self, subscriber: WatcherId) {
        Runtime::remove_sub(self.id, subscriber);
    }

    /// Register this dep with the watcher currently collecting dependencies.
    pub fn depend(&self) {
        depend_on(self.id);
    }

    /// Ask every subscriber to update.
    ///
    /// The subscriber list is snapshotted first, so subscribers that tear
    /// themselves down (or subscribe others) while being notified do not
    /// affect this pass.
    pub fn notify(&self) {
        let subs = Runtime::subscribers_of(self.id);
        tracing::trace!(dep = %self.id, subscribers = subs.len(), "notify");

        for id in subs {
            if let Some(subscriber) = Runtime::subscriber(id) {
                subscriber.update();
            }
        }
    }

    /// Current subscribers, in subscription order.
    pub fn subscribers(&self) -> Vec<WatcherId> {
        Runtime::subscribers_of(self.id)
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dep {
    fn drop(&mut self) {
        Runtime::drop_dep(self.id);
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Register `dep` with the active watcher, if there is one.
pub(crate) fn depend_on(dep: DepId) {
    if let Some(target) = context::current() {
        target.add_dep(dep);
    }
}
