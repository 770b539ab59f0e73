//! Reactive arrays.
//!
//! Element reads and writes by index cannot be tracked one by one, so an
//! [`Array`] exposes a small set of mutating methods as its only mutation
//! surface: `push`, `pop`, `shift`, `unshift`, `splice`, `sort` and
//! `reverse`. Each performs the plain operation and then, if the array is
//! observed, observes any inserted elements and notifies the array's own dep.
//!
//! Watchers depend on an array through the property that holds it: reading
//! that property subscribes to the array's observer dep (and recursively to
//! nested arrays and objects).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::observe::{observe, Observer};
use super::value::Value;
use crate::error;

struct ArrayData {
    items: Vec<Value>,
    observer: Option<Observer>,
    extensible: bool,
    frozen: bool,
}

/// A shared, mutable array with reference identity.
#[derive(Clone)]
pub struct Array(Rc<RefCell<ArrayData>>);

impl Array {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(ArrayData {
            items,
            observer: None,
            extensible: true,
            frozen: false,
        })))
    }

    /// Whether both handles refer to the same array.
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`. Element reads are not tracked.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().items.get(index).cloned()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Append an element. Returns the new length.
    pub fn push(&self, value: Value) -> usize {
        self.mutate(vec![value.clone()], true, |items| {
            items.push(value);
            items.len()
        })
        .unwrap_or_else(|| self.len())
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        self.mutate(Vec::new(), false, |items| items.pop()).flatten()
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        self.mutate(Vec::new(), false, |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
        .flatten()
    }

    /// Prepend an element. Returns the new length.
    pub fn unshift(&self, value: Value) -> usize {
        self.mutate(vec![value.clone()], true, |items| {
            items.insert(0, value);
            items.len()
        })
        .unwrap_or_else(|| self.len())
    }

    /// Remove `delete_count` elements at `start` and insert `items` in their
    /// place. Returns the removed elements.
    ///
    /// `start` and `delete_count` are clamped to the array bounds.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        let len = self.len();
        let removed = delete_count.min(len - start.min(len));
        let grows = items.len() > removed;
        self.mutate(items.clone(), grows, |current| {
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, items).collect()
        })
        .unwrap_or_default()
    }

    /// Sort with [`Value::compare`].
    pub fn sort(&self) {
        self.sort_by(Value::compare);
    }

    /// Sort with a comparator.
    ///
    /// The elements are moved out of the array while the comparator runs, so
    /// the comparator must not read this array.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let (observer, mut items) = {
            let mut data = self.0.borrow_mut();
            if data.frozen {
                drop(data);
                error::warn("cannot mutate a frozen array");
                return;
            }
            (data.observer.clone(), std::mem::take(&mut data.items))
        };
        items.sort_by(&mut compare);
        self.0.borrow_mut().items = items;

        if let Some(observer) = observer {
            observer.dep().notify();
        }
    }

    /// Reverse the elements in place.
    pub fn reverse(&self) {
        self.mutate(Vec::new(), false, |items| items.reverse());
    }

    /// Forbid inserting elements. Removal and reordering still work.
    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    /// Forbid every mutation.
    pub fn freeze(&self) {
        let mut data = self.0.borrow_mut();
        data.extensible = false;
        data.frozen = true;
    }

    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    pub fn is_frozen(&self) -> bool {
        self.0.borrow().frozen
    }

    /// The observer attached to this array, if it has been observed.
    pub fn observer(&self) -> Option<Observer> {
        self.0.borrow().observer.clone()
    }

    pub(crate) fn attach_observer(&self, observer: Observer) {
        self.0.borrow_mut().observer = Some(observer);
    }

    /// Grow the array with nulls up to `len` elements, without notifying.
    /// Arrays that are not extensible are left alone.
    pub(crate) fn pad_to(&self, len: usize) {
        let mut data = self.0.borrow_mut();
        if data.extensible && data.items.len() < len {
            data.items.resize(len, Value::Null);
        }
    }

    /// Run a mutation, then observe `inserted` and notify if observed.
    ///
    /// Returns `None` without running `op` if the array is frozen, or if
    /// the operation `grows` it and the array is not extensible.
    fn mutate<R>(
        &self,
        inserted: Vec<Value>,
        grows: bool,
        op: impl FnOnce(&mut Vec<Value>) -> R,
    ) -> Option<R> {
        let observer = {
            let data = self.0.borrow();
            if data.frozen {
                drop(data);
                error::warn("cannot mutate a frozen array");
                return None;
            }
            if !data.extensible && grows {
                drop(data);
                error::warn("cannot add elements to an array that is not extensible");
                return None;
            }
            data.observer.clone()
        };

        let result = op(&mut self.0.borrow_mut().items);

        if let Some(observer) = observer {
            for value in &inserted {
                observe(value);
            }
            observer.dep().notify();
        }
        Some(result)
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self::from_vec(items)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Array")
                .field("len", &data.items.len())
                .field("observed", &data.observer.is_some())
                .finish(),
            Err(_) => f.write_str("Array { <borrowed> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Object;
    use crate::reactive::{DepId, Runtime, Subscriber, WatcherId};
    use std::cell::Cell;

    struct Counter {
        id: WatcherId,
        updates: Cell<usize>,
    }

    impl Subscriber for Counter {
        fn id(&self) -> WatcherId {
            self.id
        }
        fn expression(&self) -> String {
            "counter".into()
        }
        fn add_dep(&self, _dep: DepId) {}
        fn update(&self) {
            self.updates.set(self.updates.get() + 1);
        }
        fn run(&self) {}
    }

    fn observed(items: Vec<Value>) -> (Array, Rc<Counter>, Rc<dyn Subscriber>) {
        let array = Array::from_vec(items);
        let observer = observe(&Value::from(array.clone())).unwrap();
        let counter = Rc::new(Counter {
            id: WatcherId::new(),
            updates: Cell::new(0),
        });
        let subscriber: Rc<dyn Subscriber> = counter.clone();
        Runtime::register(&subscriber);
        observer.dep().add_sub(counter.id);
        (array, counter, subscriber)
    }

    #[test]
    fn unobserved_arrays_behave_like_vectors() {
        let array = Array::new();
        assert_eq!(array.push(Value::from(1)), 1);
        assert_eq!(array.unshift(Value::from(0)), 2);
        assert_eq!(array.pop(), Some(Value::from(1)));
        assert_eq!(array.shift(), Some(Value::from(0)));
        assert_eq!(array.shift(), None);
        assert!(array.is_empty());
    }

    #[test]
    fn every_mutation_notifies_once() {
        let (array, counter, _sub) = observed(vec![Value::from(3), Value::from(1)]);

        array.push(Value::from(2));
        array.pop();
        array.unshift(Value::from(5));
        array.shift();
        array.splice(0, 1, vec![Value::from(4)]);
        array.sort();
        array.reverse();
        assert_eq!(counter.updates.get(), 7);
        assert_eq!(array.to_vec(), vec![Value::from(4), Value::from(1)]);
    }

    #[test]
    fn inserted_containers_are_observed() {
        let (array, _counter, _sub) = observed(Vec::new());
        let pushed = Object::new();
        let spliced = Array::new();

        array.push(Value::from(pushed.clone()));
        array.splice(0, 0, vec![Value::from(spliced.clone())]);
        assert!(pushed.observer().is_some());
        assert!(spliced.observer().is_some());
    }

    #[test]
    fn splice_clamps_its_range() {
        let array: Array = (1..=4).map(Value::from).collect();
        let removed = array.splice(2, 10, Vec::new());
        assert_eq!(removed, vec![Value::from(3), Value::from(4)]);
        assert_eq!(array.splice(9, 1, vec![Value::from(9)]), Vec::new());
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn sort_by_uses_the_comparator() {
        let (array, counter, _sub) = observed((1..=3).map(Value::from).collect());
        array.sort_by(|a, b| b.compare(a));
        assert_eq!(array.get(0), Some(Value::from(3)));
        assert_eq!(counter.updates.get(), 1);
    }

    #[test]
    fn non_extensible_arrays_reject_insertion_only() {
        let array: Array = [Value::from(1), Value::from(2)].into_iter().collect();
        array.prevent_extensions();
        assert_eq!(array.push(Value::from(3)), 2);
        assert_eq!(array.unshift(Value::from(0)), 2);
        assert!(array.splice(0, 0, vec![Value::from(9)]).is_empty());
        assert_eq!(array.len(), 2);

        // same-length replacement is not growth
        assert_eq!(array.splice(0, 1, vec![Value::from(5)]), vec![Value::from(1)]);
        array.reverse();
        assert_eq!(array.to_vec(), vec![Value::from(2), Value::from(5)]);
        assert_eq!(array.splice(0, 1, Vec::new()), vec![Value::from(2)]);
        assert_eq!(array.pop(), Some(Value::from(5)));
        assert!(array.is_empty());
    }

    #[test]
    fn frozen_arrays_reject_mutation() {
        let array: Array = [Value::from(2), Value::from(1)].into_iter().collect();
        array.freeze();
        assert!(array.is_frozen());
        assert!(!array.is_extensible());
        assert_eq!(array.push(Value::from(3)), 2);
        assert_eq!(array.pop(), None);
        assert_eq!(array.shift(), None);
        array.sort();
        array.reverse();
        assert_eq!(array.to_vec(), vec![Value::from(2), Value::from(1)]);
    }
}
