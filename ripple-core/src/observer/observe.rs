//! Reactive Property Transform
//!
//! [`observe`] attaches an [`Observer`] to a plain object or array and walks
//! it, turning every enumerable property into a reactive slot via
//! [`define_reactive`]. Nested objects and arrays are observed recursively,
//! so everything reachable from tracked data becomes tracked.
//!
//! # Reactive slots
//!
//! A reactive slot owns the stored value, a private [`Dep`], and the observer
//! of the stored value (if it is an object or array). Reading the slot inside
//! a watcher subscribes the watcher to the slot's dep *and* to the child
//! observer's dep, so that structural changes to the child (new keys via
//! [`set`](super::set), array mutations) also reach the watcher. Writing a
//! value that is not [`same_value`](Value::same_value) as the current one
//! stores it, observes it and notifies.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::array::Array;
use super::object::{Getter, Object, Property, Setter, Slot};
use super::value::Value;
use crate::reactive::{context, Dep};

/// Hook run before a reactive slot stores a new value.
pub type CustomSetter = Rc<dyn Fn(&Value)>;

thread_local! {
    static SHOULD_CONVERT: Cell<bool> = const { Cell::new(true) };
}

struct ObserverInner {
    dep: Dep,
    vm_count: Cell<usize>,
}

/// The observer attached to one observed object or array.
///
/// Its dep fires on structural changes: keys added or deleted through the
/// explicit mutation API, and array mutations.
#[derive(Clone)]
pub struct Observer(Rc<ObserverInner>);

impl Observer {
    fn new() -> Self {
        Self(Rc::new(ObserverInner {
            dep: Dep::new(),
            vm_count: Cell::new(0),
        }))
    }

    /// Dep notified on structural changes.
    pub fn dep(&self) -> &Dep {
        &self.0.dep
    }

    /// Number of roots that use this value as their root data.
    pub fn vm_count(&self) -> usize {
        self.0.vm_count.get()
    }

    /// Whether both handles refer to the same observer.
    pub fn ptr_eq(&self, other: &Observer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.0.dep.id())
            .field("vm_count", &self.vm_count())
            .finish()
    }
}

/// Attach an observer to `value`, or return the one it already has.
///
/// Returns `None` for scalars, opaque objects, non-extensible values, and
/// while conversion is disabled by [`without_conversion`].
pub fn observe(value: &Value) -> Option<Observer> {
    match value {
        Value::Object(object) => observe_object(object),
        Value::Array(array) => observe_array(array),
        _ => None,
    }
}

/// Observe `value` as the root data of a component-like owner.
///
/// Root data may not gain or lose keys through [`set`](super::set) and
/// [`del`](super::del) without a warning.
pub fn observe_root(value: &Value) -> Option<Observer> {
    let observer = observe(value)?;
    observer.0.vm_count.set(observer.0.vm_count.get() + 1);
    Some(observer)
}

/// Run `f` with observer creation disabled.
///
/// Values that are already observed keep their observers; new values
/// assigned inside `f` stay plain.
pub fn without_conversion<T>(f: impl FnOnce() -> T) -> T {
    let previous = SHOULD_CONVERT.with(|c| c.replace(false));
    let result = f();
    SHOULD_CONVERT.with(|c| c.set(previous));
    result
}

fn should_convert() -> bool {
    SHOULD_CONVERT.with(Cell::get)
}

fn observe_object(object: &Object) -> Option<Observer> {
    if let Some(observer) = object.observer() {
        return Some(observer);
    }
    if !should_convert() || !object.is_plain() || !object.is_extensible() {
        return None;
    }

    let observer = Observer::new();
    // attach first so cycles back to this object short-circuit
    object.attach_observer(observer.clone());
    tracing::debug!(dep = %observer.dep().id(), "observing object");

    for key in object.keys() {
        let value = object.raw_value(&key).unwrap_or_default();
        define_reactive(object, &key, value, None);
    }
    Some(observer)
}

fn observe_array(array: &Array) -> Option<Observer> {
    if let Some(observer) = array.observer() {
        return Some(observer);
    }
    if !should_convert() || !array.is_extensible() {
        return None;
    }

    let observer = Observer::new();
    array.attach_observer(observer.clone());
    tracing::debug!(dep = %observer.dep().id(), len = array.len(), "observing array");

    for item in array.to_vec() {
        observe(&item);
    }
    Some(observer)
}

/// Turn `key` on `object` into a reactive slot holding `value`.
///
/// Non-configurable properties are left alone. If the property is an
/// accessor, its getter and setter keep providing the storage and the slot
/// only adds tracking. `custom_setter` runs before every effective write.
pub fn define_reactive(
    object: &Object,
    key: &str,
    value: Value,
    custom_setter: Option<CustomSetter>,
) {
    let existing = object.property(key);
    if existing.as_ref().is_some_and(|p| !p.flags.configurable) {
        tracing::debug!(key, "skipping non-configurable property");
        return;
    }

    let (getter, setter): (Option<Getter>, Option<Setter>) = match existing.map(|p| p.slot) {
        Some(Slot::Accessor { get, set }) => (get, set),
        Some(Slot::Reactive(previous)) => {
            let read = previous.clone();
            let getter: Getter = Rc::new(move || read.get());
            let setter: Setter = Rc::new(move |v: Value| previous.set(v));
            (Some(getter), Some(setter))
        }
        _ => (None, None),
    };

    let child = observe(&value);
    let property = ReactiveProperty {
        dep: Dep::new(),
        value: RefCell::new(value),
        child: RefCell::new(child),
        getter,
        setter,
        custom_setter,
    };
    object.install(key, Property::reactive(Rc::new(property)));
}

/// Storage and bookkeeping of one reactive slot.
pub(crate) struct ReactiveProperty {
    dep: Dep,
    value: RefCell<Value>,
    child: RefCell<Option<Observer>>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    custom_setter: Option<CustomSetter>,
}

impl ReactiveProperty {
    fn current(&self) -> Value {
        match &self.getter {
            Some(getter) => getter(),
            None => self.value.borrow().clone(),
        }
    }

    pub(crate) fn get(&self) -> Value {
        let value = self.current();
        if context::is_tracking() {
            self.dep.depend();
            let child = self.child.borrow().clone();
            if let Some(child) = child {
                child.dep().depend();
            }
            if let Value::Array(array) = &value {
                depend_array(array);
            }
        }
        value
    }

    pub(crate) fn set(&self, new_value: Value) {
        let value = context::untracked(|| self.current());
        if new_value.same_value(&value) {
            return;
        }
        if let Some(hook) = &self.custom_setter {
            hook(&new_value);
        }

        let child = observe(&new_value);
        match &self.setter {
            Some(setter) => setter(new_value),
            None => *self.value.borrow_mut() = new_value,
        }
        *self.child.borrow_mut() = child;

        self.dep.notify();
    }

    #[cfg(test)]
    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }
}

/// Subscribe the active watcher to every observed element of `array`,
/// recursing into nested arrays.
///
/// Element access cannot be intercepted, so touching an array counts as
/// touching everything in it.
pub(crate) fn depend_array(array: &Array) {
    let mut visiting = vec![array.clone()];
    depend_elements(array, &mut visiting);
}

fn depend_elements(array: &Array, visiting: &mut Vec<Array>) {
    for item in array.to_vec() {
        match &item {
            Value::Object(object) => {
                if let Some(observer) = object.observer() {
                    observer.dep().depend();
                }
            }
            Value::Array(inner) => {
                if let Some(observer) = inner.observer() {
                    observer.dep().depend();
                }
                if !visiting.iter().any(|a| a.ptr_eq(inner)) {
                    visiting.push(inner.clone());
                    depend_elements(inner, visiting);
                }
            }
            _ => {}
        }
    }
}
