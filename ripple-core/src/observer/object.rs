//! Reactive-capable objects.
//!
//! An [`Object`] is an insertion-ordered map of properties. Each property is
//! one of three slot kinds:
//!
//! - a plain data slot,
//! - an accessor pair (getter/setter closures),
//! - a reactive slot installed by [`define_reactive`](super::define_reactive).
//!
//! Reads and writes go through [`Object::get`] and [`Object::set`], which
//! dispatch on the slot kind. Reactive slots perform dependency tracking and
//! notification; the other kinds behave like ordinary storage.
//!
//! The object's interior borrow is never held while a getter, setter or
//! notification runs, so reactive code may freely re-enter the same object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::observe::{Observer, ReactiveProperty};
use super::value::Value;
use crate::error;
use crate::reactive::context;

/// Getter half of an accessor property.
pub type Getter = Rc<dyn Fn() -> Value>;

/// Setter half of an accessor property.
pub type Setter = Rc<dyn Fn(Value)>;

#[derive(Clone)]
pub(crate) enum Slot {
    Data(Value),
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
    Reactive(Rc<ReactiveProperty>),
}

/// Attribute flags of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    /// Listed by [`Object::keys`] and picked up by the reactive walk.
    pub enumerable: bool,
    /// May be redefined or deleted.
    pub configurable: bool,
    /// May be assigned. Ignored for accessor and reactive slots.
    pub writable: bool,
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self {
            enumerable: true,
            configurable: true,
            writable: true,
        }
    }
}

#[derive(Clone)]
pub(crate) struct Property {
    pub(crate) slot: Slot,
    pub(crate) flags: PropertyFlags,
}

impl Property {
    pub(crate) fn reactive(property: Rc<ReactiveProperty>) -> Self {
        Self {
            slot: Slot::Reactive(property),
            flags: PropertyFlags::default(),
        }
    }
}

struct ObjectData {
    props: IndexMap<String, Property>,
    observer: Option<Observer>,
    extensible: bool,
    plain: bool,
}

/// A shared, mutable object with reference identity.
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    /// Create an empty plain object.
    pub fn new() -> Self {
        Self::with_kind(true)
    }

    /// Create an empty host-instance object.
    ///
    /// Opaque objects are never observed, and `set`/`del` warn when used on
    /// them.
    pub fn opaque() -> Self {
        Self::with_kind(false)
    }

    fn with_kind(plain: bool) -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            props: IndexMap::new(),
            observer: None,
            extensible: true,
            plain,
        })))
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Read a property. Returns `None` if the object has no such own key.
    ///
    /// Reading a reactive property inside a watcher records a dependency.
    pub fn get(&self, key: &str) -> Option<Value> {
        let slot = self.0.borrow().props.get(key).map(|p| p.slot.clone())?;
        Some(read_slot(&slot))
    }

    /// Assign a property, like `obj[key] = value`.
    ///
    /// Existing reactive properties notify their watchers. New keys become
    /// plain data properties; use [`set`](super::set) to add a reactive one.
    pub fn set(&self, key: &str, value: Value) {
        let existing = self.0.borrow().props.get(key).cloned();
        match existing {
            Some(Property {
                slot: Slot::Reactive(property),
                ..
            }) => property.set(value),
            Some(Property {
                slot: Slot::Accessor { set: Some(setter), .. },
                ..
            }) => setter(value),
            Some(Property {
                slot: Slot::Accessor { set: None, .. },
                ..
            }) => error::warn(&format!(
                "cannot assign to property \"{key}\" which has only a getter"
            )),
            Some(Property { flags, .. }) => {
                if !flags.writable {
                    error::warn(&format!("cannot assign to read-only property \"{key}\""));
                    return;
                }
                if let Some(prop) = self.0.borrow_mut().props.get_mut(key) {
                    prop.slot = Slot::Data(value);
                }
            }
            None => {
                let mut data = self.0.borrow_mut();
                if !data.extensible {
                    drop(data);
                    error::warn(&format!(
                        "cannot add property \"{key}\", object is not extensible"
                    ));
                    return;
                }
                data.props.insert(
                    key.to_string(),
                    Property {
                        slot: Slot::Data(value),
                        flags: PropertyFlags::default(),
                    },
                );
            }
        }
    }

    /// Define a data property with explicit flags.
    ///
    /// Returns `false` if an existing property is not configurable or the
    /// object is not extensible.
    pub fn define_property(&self, key: &str, value: Value, flags: PropertyFlags) -> bool {
        self.define(key, Slot::Data(value), flags)
    }

    /// Define an accessor property.
    ///
    /// A later [`define_reactive`](super::define_reactive) on the same key keeps
    /// using these closures for storage.
    pub fn define_accessor<G>(&self, key: &str, getter: G, setter: Option<Setter>) -> bool
    where
        G: Fn() -> Value + 'static,
    {
        self.define(
            key,
            Slot::Accessor {
                get: Some(Rc::new(getter)),
                set: setter,
            },
            PropertyFlags::default(),
        )
    }

    fn define(&self, key: &str, slot: Slot, flags: PropertyFlags) -> bool {
        let mut data = self.0.borrow_mut();
        match data.props.get(key) {
            Some(existing) if !existing.flags.configurable => return false,
            None if !data.extensible => return false,
            _ => {}
        }
        data.props.insert(key.to_string(), Property { slot, flags });
        true
    }

    /// Whether the object has `key` as an own property.
    pub fn has_own(&self, key: &str) -> bool {
        self.0.borrow().props.contains_key(key)
    }

    /// Enumerable own keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .borrow()
            .props
            .iter()
            .filter(|(_, p)| p.flags.enumerable)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.0.borrow().props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove an own property without notifying anyone.
    ///
    /// Returns `false` if the key is absent or not configurable. Use
    /// [`del`](super::del) to delete with notification.
    pub fn delete(&self, key: &str) -> bool {
        let removed = {
            let mut data = self.0.borrow_mut();
            let configurable = data.props.get(key).is_some_and(|p| p.flags.configurable);
            if configurable {
                data.props.shift_remove(key)
            } else {
                None
            }
        };
        removed.is_some()
    }

    /// Forbid adding new properties.
    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    /// Forbid adding, removing, redefining and assigning data properties.
    pub fn freeze(&self) {
        let mut data = self.0.borrow_mut();
        data.extensible = false;
        for prop in data.props.values_mut() {
            prop.flags.configurable = false;
            prop.flags.writable = false;
        }
    }

    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    /// Whether this is a plain object (as opposed to an opaque instance).
    pub fn is_plain(&self) -> bool {
        self.0.borrow().plain
    }

    /// The observer attached to this object, if it has been observed.
    pub fn observer(&self) -> Option<Observer> {
        self.0.borrow().observer.clone()
    }

    pub(crate) fn attach_observer(&self, observer: Observer) {
        self.0.borrow_mut().observer = Some(observer);
    }

    pub(crate) fn property(&self, key: &str) -> Option<Property> {
        self.0.borrow().props.get(key).cloned()
    }

    /// Replace a property, regardless of flags. Callers check configurability.
    pub(crate) fn install(&self, key: &str, property: Property) {
        self.0.borrow_mut().props.insert(key.to_string(), property);
    }

    /// Read a property without recording dependencies.
    pub(crate) fn raw_value(&self, key: &str) -> Option<Value> {
        context::untracked(|| self.get(key))
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let object = Object::new();
        {
            let mut data = object.0.borrow_mut();
            for (k, v) in iter {
                data.props.insert(
                    k.into(),
                    Property {
                        slot: Slot::Data(v),
                        flags: PropertyFlags::default(),
                    },
                );
            }
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Object")
                .field("keys", &data.props.keys().collect::<Vec<_>>())
                .field("observed", &data.observer.is_some())
                .finish(),
            Err(_) => f.write_str("Object { <borrowed> }"),
        }
    }
}

fn read_slot(slot: &Slot) -> Value {
    match slot {
        Slot::Data(value) => value.clone(),
        Slot::Accessor { get: Some(getter), .. } => getter(),
        Slot::Accessor { get: None, .. } => Value::Null,
        Slot::Reactive(property) => property.get(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn plain_get_and_set() {
        let obj = Object::new();
        assert_eq!(obj.get("a"), None);

        obj.set("a", Value::from(1));
        obj.set("b", Value::from("two"));
        assert_eq!(obj.get("a"), Some(Value::from(1)));
        assert_eq!(obj.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn accessor_properties_call_through() {
        let store = Rc::new(Cell::new(1.0));
        let read = store.clone();
        let write = store.clone();

        let obj = Object::new();
        obj.define_accessor(
            "x",
            move || Value::from(read.get()),
            Some(Rc::new(move |v: Value| write.set(v.as_f64().unwrap_or(0.0)))),
        );

        assert_eq!(obj.get("x"), Some(Value::from(1.0)));
        obj.set("x", Value::from(7.0));
        assert_eq!(store.get(), 7.0);
    }

    #[test]
    fn non_configurable_properties_cannot_be_redefined_or_deleted() {
        let obj = Object::new();
        let flags = PropertyFlags {
            configurable: false,
            ..PropertyFlags::default()
        };
        assert!(obj.define_property("fixed", Value::from(1), flags));
        assert!(!obj.define_property("fixed", Value::from(2), PropertyFlags::default()));
        assert!(!obj.delete("fixed"));
        assert_eq!(obj.get("fixed"), Some(Value::from(1)));
    }

    #[test]
    fn hidden_properties_are_not_enumerated() {
        let obj = Object::new();
        obj.set("shown", Value::Null);
        obj.define_property(
            "hidden",
            Value::Null,
            PropertyFlags {
                enumerable: false,
                ..PropertyFlags::default()
            },
        );
        assert_eq!(obj.keys(), vec!["shown".to_string()]);
        assert!(obj.has_own("hidden"));
    }

    #[test]
    fn frozen_objects_ignore_writes() {
        let obj: Object = [("a", Value::from(1))].into_iter().collect();
        obj.freeze();

        obj.set("a", Value::from(2));
        obj.set("b", Value::from(3));
        assert_eq!(obj.get("a"), Some(Value::from(1)));
        assert!(!obj.has_own("b"));
        assert!(!obj.is_extensible());
    }
}
