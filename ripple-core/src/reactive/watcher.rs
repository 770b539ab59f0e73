//! Watcher Implementation
//!
//! A watcher is one re-evaluatable unit: a render computation, a computed
//! value, or a user watch. It evaluates a getter against a context value,
//! records every dep read during the evaluation, and re-runs when any of them
//! notifies.
//!
//! # Lifecycle
//!
//! 1. Non-lazy watchers evaluate once at construction. Lazy watchers start
//!    dirty and evaluate on demand via [`Watcher::evaluate`].
//!
//! 2. Each evaluation collects a fresh dependency list. Afterwards the
//!    watcher subscribes to deps it did not have before and unsubscribes from
//!    deps it no longer read, so the subscription set always equals the deps
//!    of the latest evaluation.
//!
//! 3. When a dep notifies, [`Watcher::update`] marks a lazy watcher dirty,
//!    runs a sync watcher immediately, and queues anything else in the
//!    scheduler.
//!
//! 4. [`Watcher::teardown`] removes the watcher from every dep. A torn-down
//!    watcher ignores all further updates.
//!
//! # Failures
//!
//! Getter and callback errors never escape. They go to
//! [`handle_error`](crate::error::handle_error); a failed evaluation keeps
//! the previous value.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ActiveTarget;
use super::dep::{self, DepId};
use super::runtime::Runtime;
use super::subscriber::{Subscriber, WatcherId};
use crate::config;
use crate::error::{self, BoxError, ReactiveError};
use crate::observer::{traverse, Value};
use crate::scheduler;

/// Getter evaluated against the watcher's context value.
pub type WatchGetter = Rc<dyn Fn(&Value) -> Result<Value, BoxError>>;

/// Change callback, invoked with `(new, old)`.
pub type WatchCallback = Rc<dyn Fn(&Value, &Value) -> Result<(), BoxError>>;

type DepList = SmallVec<[DepId; 8]>;

/// What a watcher evaluates.
#[derive(Clone)]
pub enum WatchSource {
    /// A dot-delimited property path resolved against the context, such as
    /// `"user.profile.name"`.
    Path(String),
    /// An arbitrary getter.
    Getter(WatchGetter),
}

impl WatchSource {
    /// Wrap a getter closure.
    pub fn getter<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + 'static,
    {
        WatchSource::Getter(Rc::new(f))
    }

    fn into_getter(self) -> (WatchGetter, String) {
        match self {
            WatchSource::Path(path) => {
                let getter = match parse_path(&path) {
                    Some(segments) => {
                        let getter: WatchGetter =
                            Rc::new(move |context: &Value| Ok(resolve_path(context, &segments)));
                        getter
                    }
                    None => {
                        error::warn(&format!(
                            "failed watching path \"{path}\": only simple dot-delimited paths are accepted, use a getter instead"
                        ));
                        let getter: WatchGetter = Rc::new(|_: &Value| Ok(Value::Null));
                        getter
                    }
                };
                (getter, path)
            }
            WatchSource::Getter(getter) => (getter, "<getter>".to_string()),
        }
    }
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> Self {
        WatchSource::Path(path.to_string())
    }
}

impl From<String> for WatchSource {
    fn from(path: String) -> Self {
        WatchSource::Path(path)
    }
}

impl From<WatchGetter> for WatchSource {
    fn from(getter: WatchGetter) -> Self {
        WatchSource::Getter(getter)
    }
}

impl fmt::Debug for WatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            WatchSource::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

/// Split a watch path into segments.
///
/// Returns `None` if the path contains anything besides word characters,
/// `.` and `$`.
pub fn parse_path(path: &str) -> Option<Vec<String>> {
    let valid = path
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$');
    if !valid {
        return None;
    }
    Some(path.split('.').map(str::to_string).collect())
}

/// Follow `segments` from `context`. Missing links resolve to `Null`.
fn resolve_path(context: &Value, segments: &[String]) -> Value {
    let mut current = context.clone();
    for segment in segments {
        current = match &current {
            Value::Object(object) => object.get(segment).unwrap_or_default(),
            Value::Array(array) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| array.get(index))
                .unwrap_or_default(),
            _ => return Value::Null,
        };
    }
    current
}

/// Behavior switches of a watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Evaluate on demand only; updates just mark the watcher dirty.
    pub lazy: bool,
    /// Run immediately on update instead of queueing.
    pub sync: bool,
    /// Track everything reachable from the value, and always fire the
    /// callback on run.
    pub deep: bool,
    /// Created by user code rather than the engine. Errors from user
    /// watchers are labeled as such when reported.
    pub user: bool,
}

struct WatcherInner {
    id: WatcherId,
    this: Weak<WatcherInner>,
    context: Value,
    getter: WatchGetter,
    expression: String,
    callback: Option<WatchCallback>,
    options: WatcherOptions,
    value: RefCell<Value>,
    dirty: Cell<bool>,
    active: Cell<bool>,
    deps: RefCell<DepList>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<DepList>,
    new_dep_ids: RefCell<HashSet<DepId>>,
    /// Nesting of `run` on the stack, bounded for sync watchers that write
    /// what they read.
    depth: Cell<usize>,
}

/// Handle to a watcher. Clones share the same watcher.
///
/// The watcher lives as long as any handle does. Dropping the last handle
/// removes it from every dep.
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl Watcher {
    /// Create a watcher without a change callback, such as a render
    /// computation or a computed value.
    pub fn new(context: Value, source: impl Into<WatchSource>, options: WatcherOptions) -> Self {
        Self::build(context, source.into(), None, options)
    }

    /// Create a watcher that invokes `callback(new, old)` when its value
    /// changes.
    pub fn with_callback<F>(
        context: Value,
        source: impl Into<WatchSource>,
        callback: F,
        options: WatcherOptions,
    ) -> Self
    where
        F: Fn(&Value, &Value) -> Result<(), BoxError> + 'static,
    {
        Self::build(context, source.into(), Some(Rc::new(callback)), options)
    }

    fn build(
        context: Value,
        source: WatchSource,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Self {
        let (getter, expression) = source.into_getter();
        let inner = Rc::new_cyclic(|this| WatcherInner {
            id: WatcherId::new(),
            this: this.clone(),
            context,
            getter,
            expression,
            callback,
            options,
            value: RefCell::new(Value::Null),
            dirty: Cell::new(options.lazy),
            active: Cell::new(true),
            deps: RefCell::new(SmallVec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(SmallVec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            depth: Cell::new(0),
        });

        let subscriber: Rc<dyn Subscriber> = inner.clone();
        Runtime::register(&subscriber);
        tracing::trace!(watcher = %inner.id, expression = %inner.expression, "watcher created");

        if !options.lazy {
            let value = inner.get();
            *inner.value.borrow_mut() = value;
        }
        Self { inner }
    }

    /// The watcher's creation-ordered id.
    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    /// Path or label used in diagnostics.
    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    pub fn options(&self) -> WatcherOptions {
        self.inner.options
    }

    /// The value of the latest evaluation.
    pub fn value(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Whether a lazy watcher must re-evaluate before its value is used.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Whether the watcher has not been torn down.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Deps read during the latest evaluation.
    pub fn deps(&self) -> Vec<DepId> {
        self.inner.deps.borrow().to_vec()
    }

    /// Evaluate the getter while collecting dependencies, and return the
    /// result without storing it.
    pub fn get(&self) -> Value {
        self.inner.get()
    }

    /// React to a dependency change.
    pub fn update(&self) {
        self.inner.update();
    }

    /// Re-evaluate and fire the callback if the value changed.
    pub fn run(&self) {
        self.inner.run();
    }

    /// Evaluate a lazy watcher and clear its dirty flag.
    pub fn evaluate(&self) {
        self.inner.evaluate();
    }

    /// Make the currently active watcher depend on everything this watcher
    /// depends on.
    pub fn depend(&self) {
        self.inner.depend();
    }

    /// Remove the watcher from every dep. Further updates are ignored.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("expression", &self.inner.expression)
            .field("options", &self.inner.options)
            .field("dirty", &self.inner.dirty.get())
            .field("active", &self.inner.active.get())
            .finish()
    }
}

impl WatcherInner {
    fn get(&self) -> Value {
        let Some(this) = self.this.upgrade() else {
            return self.value.borrow().clone();
        };

        let value = {
            let _target = ActiveTarget::enter(this);
            let value = match (self.getter)(&self.context) {
                Ok(value) => value,
                Err(source) => {
                    let info = format!("getter for {} \"{}\"", self.label(), self.expression);
                    let err = ReactiveError::Getter {
                        expression: self.expression.clone(),
                        source,
                    };
                    error::handle_error(&err, &self.expression, &info);
                    self.value.borrow().clone()
                }
            };
            if self.options.deep {
                traverse(&value);
            }
            value
        };

        self.cleanup_deps();
        value
    }

    /// Swap in the deps of the evaluation that just finished and drop
    /// subscriptions that were not renewed.
    fn cleanup_deps(&self) {
        let new_deps = std::mem::take(&mut *self.new_deps.borrow_mut());
        let new_ids = std::mem::take(&mut *self.new_dep_ids.borrow_mut());
        let old_deps = std::mem::replace(&mut *self.deps.borrow_mut(), new_deps);
        *self.dep_ids.borrow_mut() = new_ids;

        let current = self.dep_ids.borrow();
        for stale in old_deps.iter().filter(|d| !current.contains(d)) {
            Runtime::remove_sub(*stale, self.id);
        }
    }

    fn label(&self) -> &'static str {
        if self.options.user {
            "user watcher"
        } else {
            "watcher"
        }
    }

    fn update(&self) {
        if !self.active.get() {
            return;
        }
        if self.options.lazy {
            self.dirty.set(true);
        } else if self.options.sync {
            self.run();
        } else {
            scheduler::queue_watcher(self.id);
        }
    }

    fn run(&self) {
        if !self.active.get() {
            return;
        }

        let depth = self.depth.get() + 1;
        if depth > config::current().max_update_count {
            tracing::debug!(watcher = %self.id, depth, "halting re-entrant watcher run");
            let err = ReactiveError::CircularUpdate {
                watcher: self.id,
                expression: self.expression.clone(),
                count: depth,
            };
            error::handle_error(&err, &self.expression, "nested watcher run");
            return;
        }
        self.depth.set(depth);
        self.run_once();
        self.depth.set(depth - 1);
    }

    fn run_once(&self) {
        let value = self.get();
        let old = self.value.borrow().clone();
        if value.same_value(&old) && !value.is_object_like() && !self.options.deep {
            return;
        }

        *self.value.borrow_mut() = value.clone();
        if let Some(callback) = &self.callback {
            if let Err(source) = callback(&value, &old) {
                let info = format!("callback for {} \"{}\"", self.label(), self.expression);
                let err = ReactiveError::Callback {
                    expression: self.expression.clone(),
                    source,
                };
                error::handle_error(&err, &self.expression, &info);
            }
        }
    }

    fn evaluate(&self) {
        let value = self.get();
        *self.value.borrow_mut() = value;
        self.dirty.set(false);
    }

    fn depend(&self) {
        let deps = self.deps.borrow().clone();
        for dep in deps {
            dep::depend_on(dep);
        }
    }

    fn teardown(&self) {
        if !self.active.get() {
            return;
        }
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        self.dep_ids.borrow_mut().clear();
        for dep in deps {
            Runtime::remove_sub(dep, self.id);
        }
        self.active.set(false);
        tracing::trace!(watcher = %self.id, "watcher torn down");
    }
}

impl Subscriber for WatcherInner {
    fn id(&self) -> WatcherId {
        self.id
    }

    fn expression(&self) -> String {
        self.expression.clone()
    }

    fn add_dep(&self, dep: DepId) {
        if !self.new_dep_ids.borrow_mut().insert(dep) {
            return;
        }
        self.new_deps.borrow_mut().push(dep);
        if !self.dep_ids.borrow().contains(&dep) {
            Runtime::add_sub(dep, self.id);
        }
    }

    fn update(&self) {
        WatcherInner::update(self);
    }

    fn run(&self) {
        WatcherInner::run(self);
    }
}

impl Drop for WatcherInner {
    fn drop(&mut self) {
        Runtime::release(self.id, self.deps.get_mut());
        Runtime::unregister(self.id);
    }
}
