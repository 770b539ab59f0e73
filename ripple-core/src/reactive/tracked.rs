//! Tracked Cells
//!
//! A [`Tracked`] holds one typed value behind its own [`Dep`]. It is the
//! strongly typed counterpart of a reactive object property: reading it inside
//! a watcher records a dependency, and writing a different value notifies.
//!
//! # Example
//!
//! ```rust,ignore
//! let count = Tracked::new(0);
//!
//! // Read the value (tracked when a watcher is evaluating)
//! let value = count.get();
//!
//! // Update the value (notifies subscribers)
//! count.set(5);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::dep::{Dep, DepId};

struct TrackedInner<T> {
    dep: Dep,
    value: RefCell<T>,
}

/// A reactive cell holding a value of type `T`.
///
/// Clones share the same cell.
pub struct Tracked<T> {
    inner: Rc<TrackedInner<T>>,
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Tracked<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(TrackedInner {
                dep: Dep::new(),
                value: RefCell::new(value),
            }),
        }
    }

    /// Id of the cell's dep.
    pub fn id(&self) -> DepId {
        self.inner.dep.id()
    }

    /// Get the current value, recording a dependency if a watcher is
    /// collecting.
    pub fn get(&self) -> T {
        self.inner.dep.depend();
        self.get_untracked()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Store a new value and notify subscribers.
    ///
    /// Writing a value equal to the current one does nothing. A value that is
    /// not equal to itself (a float `NaN`) counts as equal to another such
    /// value.
    pub fn set(&self, value: T) {
        {
            let current = self.inner.value.borrow();
            #[allow(clippy::eq_op)]
            let unchanged = value == *current || (value != value && *current != *current);
            if unchanged {
                return;
            }
        }
        *self.inner.value.borrow_mut() = value;
        self.inner.dep.notify();
    }

    /// Update the value with a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }

    /// Number of watchers subscribed to this cell.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.subscriber_count()
    }
}

impl<T> fmt::Debug for Tracked<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Tracked");
        s.field("dep", &self.inner.dep.id());
        match self.inner.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set() {
        let cell = Tracked::new(42);
        assert_eq!(cell.get(), 42);

        cell.set(100);
        assert_eq!(cell.get(), 100);
    }

    #[test]
    fn update_with_function() {
        let cell = Tracked::new(10);
        cell.update(|v| v * 2);
        assert_eq!(cell.get(), 20);
    }

    #[test]
    fn clones_share_the_cell() {
        let a = Tracked::new(String::from("a"));
        let b = a.clone();
        b.set("b".into());
        assert_eq!(a.get_untracked(), "b");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn nan_writes_are_not_changes() {
        let cell = Tracked::new(f64::NAN);
        cell.set(f64::NAN);
        assert!(cell.get().is_nan());
    }
}
