//! Explicit Mutation API
//!
//! Adding a key to an object, or writing an array element by index, bypasses
//! reactive slots entirely: there is no slot yet, or no per-index slot at all.
//! [`set`] and [`del`] cover those blind spots and notify the container's
//! observer dep so watchers that depend on the container's shape re-run.

use super::observe::define_reactive;
use super::value::{Key, Value};
use crate::error;

/// Set `key` on `target` to `value`, adding a reactive property if needed.
///
/// - array + index: pads the array if needed and splices the value in, which
///   notifies through the array's observer;
/// - existing own key: plain assignment, already reactive;
/// - unobserved object: plain assignment;
/// - observed object: defines a reactive property and notifies the object's
///   observer dep.
///
/// Returns `value`.
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Value {
    let key = key.into();
    match (target, &key) {
        (Value::Array(array), Key::Index(index)) => {
            array.pad_to(*index);
            array.splice(*index, 1, vec![value.clone()]);
            value
        }
        (Value::Array(_), Key::Name(name)) => {
            error::warn(&format!(
                "cannot set non-index key \"{name}\" on an array"
            ));
            value
        }
        (Value::Object(object), key) => {
            let name = key.as_name();
            if object.has_own(&name) {
                object.set(&name, value.clone());
                return value;
            }

            let observer = object.observer();
            if !object.is_plain() || observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
                error::warn(&format!(
                    "avoid adding reactive property \"{name}\" to an instance or its root data at runtime, declare it upfront instead"
                ));
            }

            let Some(observer) = observer else {
                object.set(&name, value.clone());
                return value;
            };
            if !object.is_extensible() {
                error::warn(&format!(
                    "cannot add property \"{name}\", object is not extensible"
                ));
                return value;
            }

            define_reactive(object, &name, value.clone(), None);
            observer.dep().notify();
            value
        }
        (other, key) => {
            error::warn(&format!(
                "cannot set reactive property \"{key}\" on a {} value",
                other.type_name()
            ));
            value
        }
    }
}

/// Delete `key` from `target` and notify if the target is observed.
///
/// Absent keys are ignored silently. Deleting from an instance or its root
/// data warns and does nothing.
pub fn del(target: &Value, key: impl Into<Key>) {
    let key = key.into();
    match (target, &key) {
        (Value::Array(array), Key::Index(index)) => {
            if *index < array.len() {
                array.splice(*index, 1, Vec::new());
            }
        }
        (Value::Array(_), Key::Name(name)) => {
            error::warn(&format!(
                "cannot delete non-index key \"{name}\" from an array"
            ));
        }
        (Value::Object(object), key) => {
            let name = key.as_name();
            let observer = object.observer();
            if !object.is_plain() || observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
                error::warn(&format!(
                    "avoid deleting property \"{name}\" on an instance or its root data, set it to null instead"
                ));
                return;
            }
            if !object.has_own(&name) {
                return;
            }
            if !object.delete(&name) {
                error::warn(&format!("cannot delete non-configurable property \"{name}\""));
                return;
            }
            if let Some(observer) = observer {
                observer.dep().notify();
            }
        }
        (other, key) => {
            error::warn(&format!(
                "cannot delete property \"{key}\" from a {} value",
                other.type_name()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::observer::{observe, observe_root, Array, Object};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn capture_warnings() -> Rc<RefCell<Vec<String>>> {
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        config::set_warn_handler(move |msg| sink.borrow_mut().push(msg.to_string()));
        warnings
    }

    #[test]
    fn set_on_plain_object_assigns() {
        let object = Object::new();
        let target = Value::from(object.clone());
        set(&target, "a", Value::from(1));
        assert_eq!(object.get("a"), Some(Value::from(1)));
        assert!(object.observer().is_none());
    }

    #[test]
    fn set_pads_arrays() {
        let array = Array::from_vec(vec![Value::from(1)]);
        let target = Value::from(array.clone());
        observe(&target);

        set(&target, 3usize, Value::from("x"));
        assert_eq!(array.len(), 4);
        assert_eq!(array.get(2), Some(Value::Null));
        assert_eq!(array.get(3), Some(Value::from("x")));

        set(&target, 0usize, Value::from(9));
        assert_eq!(array.get(0), Some(Value::from(9)));
        assert_eq!(array.len(), 4);
    }

    #[test]
    fn set_on_root_data_warns_but_proceeds() {
        let warnings = capture_warnings();
        let object = Object::new();
        let target = Value::from(object.clone());
        observe_root(&target);

        set(&target, "late", Value::from(true));
        assert_eq!(object.get("late"), Some(Value::from(true)));
        assert_eq!(warnings.borrow().len(), 1);
        config::reset();
    }

    #[test]
    fn del_removes_array_elements() {
        let array = Array::from_vec(vec![Value::from(1), Value::from(2)]);
        let target = Value::from(array.clone());
        del(&target, 0usize);
        del(&target, 5usize);
        assert_eq!(array.to_vec(), vec![Value::from(2)]);
    }

    #[test]
    fn del_on_root_data_is_ignored() {
        let warnings = capture_warnings();
        let object: Object = [("keep", Value::from(1))].into_iter().collect();
        let target = Value::from(object.clone());
        observe_root(&target);

        del(&target, "keep");
        assert!(object.has_own("keep"));
        assert_eq!(warnings.borrow().len(), 1);
        config::reset();
    }

    #[test]
    fn scalar_targets_warn() {
        let warnings = capture_warnings();
        assert_eq!(set(&Value::from(1), "a", Value::from(2)), Value::from(2));
        del(&Value::Null, "a");
        assert_eq!(warnings.borrow().len(), 2);
        config::reset();
    }
}
