//! Deep traversal for deep watchers.

use std::collections::HashSet;

use super::value::Value;
use crate::reactive::DepId;

/// Touch every reactive slot reachable from `value`.
///
/// Called while a watcher is collecting dependencies, this subscribes it to
/// all nested properties and containers. Each observed container is visited
/// once, so cyclic graphs terminate. Scalars, frozen values and unobserved
/// containers are skipped.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    walk(value, &mut seen);
}

fn walk(value: &Value, seen: &mut HashSet<DepId>) {
    match value {
        Value::Array(array) => {
            if !array.is_extensible() {
                return;
            }
            if let Some(observer) = array.observer() {
                if !seen.insert(observer.dep().id()) {
                    return;
                }
            }
            for item in array.to_vec() {
                walk(&item, seen);
            }
        }
        Value::Object(object) => {
            if !object.is_extensible() {
                return;
            }
            if let Some(observer) = object.observer() {
                if !seen.insert(observer.dep().id()) {
                    return;
                }
            }
            for key in object.keys() {
                if let Some(child) = object.get(&key) {
                    walk(&child, seen);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{observe, Object};

    #[test]
    fn terminates_on_cycles() {
        let a = Object::new();
        let b = Object::new();
        a.set("b", Value::from(b.clone()));
        b.set("a", Value::from(a.clone()));
        let root = Value::from(a);
        observe(&root);

        traverse(&root);
    }

    #[test]
    fn skips_scalars_and_frozen_values() {
        traverse(&Value::from(1));

        let frozen: Object = [("x", Value::from(1))].into_iter().collect();
        frozen.freeze();
        traverse(&Value::from(frozen));
    }
}
