//! Active-Subscriber Stack
//!
//! The stack identifies which watcher is currently collecting dependencies.
//! When a watcher evaluates, it pushes itself; every tracked read performed
//! while it is on top records a dependency on it. When the evaluation
//! completes, the guard pops it and the enclosing watcher (if any) becomes
//! current again. This supports nested evaluation, such as a computed value
//! read from inside a render watcher.
//!
//! An entry may also be empty: [`untracked`] pushes one so that reads inside
//! it record nothing, without disturbing the watchers below.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, WatcherId};

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Rc<dyn Subscriber>>>> = RefCell::new(Vec::new());
}

/// Guard that pops the stack entry it pushed when dropped.
///
/// This keeps the stack balanced even if the evaluation panics.
pub struct ActiveTarget {
    id: Option<WatcherId>,
}

impl ActiveTarget {
    /// Make `subscriber` the current dependency collector.
    pub fn enter(subscriber: Rc<dyn Subscriber>) -> Self {
        let id = subscriber.id();
        TARGET_STACK.with(|stack| stack.borrow_mut().push(Some(subscriber)));
        Self { id: Some(id) }
    }

    /// Suspend dependency collection until the guard is dropped.
    pub fn pause() -> Self {
        TARGET_STACK.with(|stack| stack.borrow_mut().push(None));
        Self { id: None }
    }
}

impl Drop for ActiveTarget {
    fn drop(&mut self) {
        let popped = TARGET_STACK
            .try_with(|stack| stack.borrow_mut().pop())
            .ok()
            .flatten();

        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.as_ref().map(|s| s.id()),
                self.id,
                "active target mismatch"
            );
        }
    }
}

/// Whether a watcher is currently collecting dependencies.
pub fn is_tracking() -> bool {
    TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// The watcher currently collecting dependencies, if any.
pub fn current() -> Option<Rc<dyn Subscriber>> {
    TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Id of the watcher currently collecting dependencies, if any.
pub fn current_id() -> Option<WatcherId> {
    TARGET_STACK.with(|stack| stack.borrow().last().and_then(|e| e.as_ref().map(|s| s.id())))
}

/// Run `f` without recording any dependencies.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _paused = ActiveTarget::pause();
    f()
}
