//! Computed Values
//!
//! A computed value is a cached derivation backed by a lazy watcher.
//!
//! # How computed values work
//!
//! 1. Nothing runs at construction. The backing watcher starts dirty.
//!
//! 2. The first read evaluates the getter and caches the result. Later reads
//!    return the cache until a dependency notifies.
//!
//! 3. A dependency change only marks the watcher dirty. Computed values that
//!    are never read again never recompute.
//!
//! 4. A read from inside another watcher re-exposes the computed value's deps
//!    to that watcher, so it re-runs when the inputs of the computation change.

use std::fmt;

use super::context;
use super::watcher::{WatchSource, Watcher, WatcherOptions};
use crate::error::BoxError;
use crate::observer::{Object, Value};

/// A lazily evaluated, cached derived value.
///
/// Clones share the same cache.
#[derive(Clone)]
pub struct Computed {
    watcher: Watcher,
}

impl Computed {
    /// Create a computed value from an infallible getter.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        Self::try_new(move || Ok(getter()))
    }

    /// Create a computed value whose getter may fail.
    ///
    /// A failed evaluation is reported to the error hook and the previous
    /// value is kept.
    pub fn try_new<F>(getter: F) -> Self
    where
        F: Fn() -> Result<Value, BoxError> + 'static,
    {
        let source = WatchSource::getter(move |_: &Value| getter());
        let watcher = Watcher::new(
            Value::Null,
            source,
            WatcherOptions {
                lazy: true,
                ..WatcherOptions::default()
            },
        );
        Self { watcher }
    }

    /// Get the current value, recomputing it first if an input changed.
    pub fn get(&self) -> Value {
        if self.watcher.is_dirty() {
            self.watcher.evaluate();
        }
        if context::is_tracking() {
            self.watcher.depend();
        }
        self.watcher.value()
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    /// The backing lazy watcher.
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("watcher", &self.watcher.id())
            .field("dirty", &self.watcher.is_dirty())
            .finish()
    }
}

/// Expose `computed` as a read-only accessor property `key` on `object`.
///
/// Returns `false` if the property could not be defined.
pub fn define_computed(object: &Object, key: &str, computed: Computed) -> bool {
    object.define_accessor(key, move || computed.get(), None)
}
