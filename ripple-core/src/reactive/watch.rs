//! User Watches
//!
//! [`watch`] is the user-facing way to react to changes: it observes a path
//! or getter against a context value and calls back with `(new, old)` after
//! the value changes.
//!
//! # Example
//!
//! ```rust,ignore
//! let handle = watch(root.clone(), "user.name", |new, old| {
//!     println!("name changed from {old:?} to {new:?}");
//!     Ok(())
//! }, WatchOptions::default());
//!
//! // ...
//! handle.unwatch();
//! ```
//!
//! Callbacks are batched through the scheduler unless `sync` is set. The
//! watch stays alive for as long as its handle does.

use std::fmt;
use std::rc::Rc;

use super::watcher::{WatchSource, Watcher, WatcherOptions};
use crate::error::{self, BoxError, ReactiveError};
use crate::observer::Value;

/// Options for [`watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Also fire for changes nested anywhere inside the value.
    pub deep: bool,
    /// Fire synchronously on every change instead of once per flush.
    pub sync: bool,
    /// Fire once right away with the initial value and `Null` as old value.
    pub immediate: bool,
}

/// Keeps a watch alive. Dropping it stops the watch.
pub struct WatchHandle {
    watcher: Watcher,
}

impl WatchHandle {
    /// Stop watching. The callback will not fire again.
    pub fn unwatch(&self) {
        self.watcher.teardown();
    }

    /// The underlying watcher.
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.watcher.teardown();
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("watcher", &self.watcher)
            .finish()
    }
}

/// Watch `source` on `context` and call `callback(new, old)` on changes.
pub fn watch<F>(
    context: Value,
    source: impl Into<WatchSource>,
    callback: F,
    options: WatchOptions,
) -> WatchHandle
where
    F: Fn(&Value, &Value) -> Result<(), BoxError> + 'static,
{
    let callback = Rc::new(callback);
    let on_change = callback.clone();
    let watcher = Watcher::with_callback(
        context,
        source,
        move |new: &Value, old: &Value| on_change(new, old),
        WatcherOptions {
            lazy: false,
            sync: options.sync,
            deep: options.deep,
            user: true,
        },
    );

    if options.immediate {
        if let Err(source) = callback(&watcher.value(), &Value::Null) {
            let info = format!("callback for immediate watcher \"{}\"", watcher.expression());
            let err = ReactiveError::Callback {
                expression: watcher.expression().to_string(),
                source,
            };
            error::handle_error(&err, watcher.expression(), &info);
        }
    }

    WatchHandle { watcher }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{observe, Object};
    use std::cell::RefCell;

    fn recorder() -> (
        Rc<RefCell<Vec<(Value, Value)>>>,
        impl Fn(&Value, &Value) -> Result<(), BoxError>,
    ) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |new: &Value, old: &Value| {
            sink.borrow_mut().push((new.clone(), old.clone()));
            Ok(())
        })
    }

    fn sync() -> WatchOptions {
        WatchOptions {
            sync: true,
            ..WatchOptions::default()
        }
    }

    #[test]
    fn immediate_fires_with_initial_value() {
        let data: Object = [("n", Value::from(1))].into_iter().collect();
        let root = Value::from(data);
        observe(&root);

        let (calls, callback) = recorder();
        let _handle = watch(
            root,
            "n",
            callback,
            WatchOptions {
                immediate: true,
                ..sync()
            },
        );
        assert_eq!(*calls.borrow(), vec![(Value::from(1), Value::Null)]);
    }

    #[test]
    fn unwatch_stops_callbacks() {
        let data: Object = [("n", Value::from(1))].into_iter().collect();
        let root = Value::from(data.clone());
        observe(&root);

        let (calls, callback) = recorder();
        let handle = watch(root, "n", callback, sync());
        data.set("n", Value::from(2));
        handle.unwatch();
        data.set("n", Value::from(3));

        assert_eq!(*calls.borrow(), vec![(Value::from(2), Value::from(1))]);
        assert!(!handle.watcher().is_active());
    }

    #[test]
    fn deep_watch_sees_nested_changes() {
        let inner: Object = [("leaf", Value::from(1))].into_iter().collect();
        let data: Object = [("nested", Value::from(inner.clone()))].into_iter().collect();
        let root = Value::from(data);
        observe(&root);

        let (calls, callback) = recorder();
        let _handle = watch(
            root,
            "nested",
            callback,
            WatchOptions {
                deep: true,
                ..sync()
            },
        );
        inner.set("leaf", Value::from(2));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn dropping_the_handle_stops_the_watch() {
        let data: Object = [("n", Value::from(1))].into_iter().collect();
        let root = Value::from(data.clone());
        observe(&root);

        let (calls, callback) = recorder();
        drop(watch(root, "n", callback, sync()));
        data.set("n", Value::from(2));
        assert!(calls.borrow().is_empty());
    }
}
