//! Reactive Runtime
//!
//! The runtime is the shared registry that connects deps and watchers. Both
//! sides refer to each other by id only:
//!
//! - every live watcher is registered under its [`WatcherId`] as a weak
//!   reference, so the registry never keeps a watcher alive;
//! - every live dep owns an ordered, duplicate-free set of subscriber ids.
//!
//! This keeps the many-to-many dep/watcher relationship free of ownership
//! cycles. Notification resolves ids back to subscribers at notify time, and
//! ids whose watcher has been dropped are simply skipped.
//!
//! # Borrowing
//!
//! The registry is a thread-local `RefCell`. No method calls into user code
//! while the registry is borrowed, and strong references handed out by
//! [`Runtime::subscriber`] are created inside the borrow but dropped outside
//! of it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;

use super::context;
use super::dep::DepId;
use super::subscriber::{Subscriber, WatcherId};

#[derive(Default)]
struct Registry {
    subscribers: HashMap<WatcherId, Weak<dyn Subscriber>>,
    deps: HashMap<DepId, IndexSet<WatcherId>>,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

/// The per-thread reactive registry.
pub struct Runtime;

impl Runtime {
    /// Register a subscriber so deps can resolve its id.
    pub fn register(subscriber: &Rc<dyn Subscriber>) {
        let id = subscriber.id();
        REGISTRY.with(|r| {
            r.borrow_mut()
                .subscribers
                .insert(id, Rc::downgrade(subscriber));
        });
    }

    /// Forget a subscriber. Its id no longer resolves.
    ///
    /// Dep subscriptions are untouched; the watcher releases its own. Safe to
    /// call from `Drop`: if the registry is unavailable (borrowed or already
    /// destroyed) this is a no-op and the stale id is skipped later.
    pub fn unregister(id: WatcherId) {
        let _ = REGISTRY.try_with(|r| {
            if let Ok(mut registry) = r.try_borrow_mut() {
                registry.subscribers.remove(&id);
            }
        });
    }

    /// Unsubscribe `subscriber` from each of `deps`. Safe to call from `Drop`.
    pub(crate) fn release(subscriber: WatcherId, deps: &[DepId]) {
        if deps.is_empty() {
            return;
        }
        let _ = REGISTRY.try_with(|r| {
            if let Ok(mut registry) = r.try_borrow_mut() {
                for dep in deps {
                    if let Some(subs) = registry.deps.get_mut(dep) {
                        subs.shift_remove(&subscriber);
                    }
                }
            }
        });
    }

    /// Resolve a subscriber id. Returns `None` once the watcher is dropped.
    pub fn subscriber(id: WatcherId) -> Option<Rc<dyn Subscriber>> {
        REGISTRY.with(|r| r.borrow().subscribers.get(&id).and_then(Weak::upgrade))
    }

    /// Create the subscriber set for a new dep.
    pub(crate) fn create_dep(id: DepId) {
        REGISTRY.with(|r| {
            r.borrow_mut().deps.insert(id, IndexSet::new());
        });
    }

    /// Drop the subscriber set of a dep whose owner is gone.
    pub(crate) fn drop_dep(id: DepId) {
        let _ = REGISTRY.try_with(|r| {
            if let Ok(mut registry) = r.try_borrow_mut() {
                registry.deps.remove(&id);
            }
        });
    }

    /// Subscribe `subscriber` to `dep`. Duplicates are ignored.
    pub fn add_sub(dep: DepId, subscriber: WatcherId) {
        REGISTRY.with(|r| {
            if let Some(subs) = r.borrow_mut().deps.get_mut(&dep) {
                subs.insert(subscriber);
            }
        });
    }

    /// Unsubscribe `subscriber` from `dep`, keeping the order of the rest.
    pub fn remove_sub(dep: DepId, subscriber: WatcherId) {
        REGISTRY.with(|r| {
            if let Some(subs) = r.borrow_mut().deps.get_mut(&dep) {
                subs.shift_remove(&subscriber);
            }
        });
    }

    /// Snapshot of a dep's subscribers in subscription order.
    pub fn subscribers_of(dep: DepId) -> Vec<WatcherId> {
        REGISTRY.with(|r| {
            r.borrow()
                .deps
                .get(&dep)
                .map(|subs| subs.iter().copied().collect())
                .unwrap_or_default()
        })
    }

    /// Whether `subscriber` is subscribed to `dep`.
    pub fn is_subscribed(dep: DepId, subscriber: WatcherId) -> bool {
        REGISTRY.with(|r| {
            r.borrow()
                .deps
                .get(&dep)
                .is_some_and(|subs| subs.contains(&subscriber))
        })
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<WatcherId> {
        context::current_id()
    }

    /// Check if we're inside a dependency-collecting evaluation.
    pub fn is_tracking() -> bool {
        context::is_tracking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct MockSubscriber {
        id: WatcherId,
        updates: Cell<usize>,
    }

    impl MockSubscriber {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                id: WatcherId::new(),
                updates: Cell::new(0),
            })
        }
    }

    impl Subscriber for MockSubscriber {
        fn id(&self) -> WatcherId {
            self.id
        }
        fn expression(&self) -> String {
            "mock".into()
        }
        fn add_dep(&self, _dep: DepId) {}
        fn update(&self) {
            self.updates.set(self.updates.get() + 1);
        }
        fn run(&self) {}
    }

    #[test]
    fn registers_and_unregisters() {
        let mock = MockSubscriber::new();
        let id = mock.id;
        let subscriber: Rc<dyn Subscriber> = mock;

        Runtime::register(&subscriber);
        assert!(Runtime::subscriber(id).is_some());

        Runtime::unregister(id);
        assert!(Runtime::subscriber(id).is_none());
    }

    #[test]
    fn dropped_subscribers_do_not_resolve() {
        let mock = MockSubscriber::new();
        let id = mock.id;
        let subscriber: Rc<dyn Subscriber> = mock;
        Runtime::register(&subscriber);

        drop(subscriber);
        assert!(Runtime::subscriber(id).is_none());
    }

    #[test]
    fn subscriber_sets_are_ordered_and_deduplicated() {
        let dep = DepId::new();
        Runtime::create_dep(dep);

        let a = WatcherId::new();
        let b = WatcherId::new();
        let c = WatcherId::new();

        Runtime::add_sub(dep, b);
        Runtime::add_sub(dep, a);
        Runtime::add_sub(dep, b);
        Runtime::add_sub(dep, c);
        assert_eq!(Runtime::subscribers_of(dep), vec![b, a, c]);

        Runtime::remove_sub(dep, a);
        assert_eq!(Runtime::subscribers_of(dep), vec![b, c]);

        Runtime::unregister(c);
        assert_eq!(Runtime::subscribers_of(dep), vec![b, c]);

        Runtime::release(c, &[dep]);
        assert_eq!(Runtime::subscribers_of(dep), vec![b]);

        Runtime::drop_dep(dep);
        assert!(Runtime::subscribers_of(dep).is_empty());
        assert!(!Runtime::is_subscribed(dep, b));
    }
}
