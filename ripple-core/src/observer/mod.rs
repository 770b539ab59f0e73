//! Observable data.
//!
//! This module owns the data side of the engine: the [`Value`] model, the
//! reactive transform that turns plain objects and arrays into tracked ones,
//! the array mutation surface, and the explicit [`set`]/[`del`] API for
//! changes the transform cannot see.

mod array;
mod mutation;
mod object;
mod observe;
mod traverse;
mod value;

pub use array::Array;
pub use mutation::{del, set};
pub use object::{Getter, Object, PropertyFlags, Setter};
pub use observe::{define_reactive, observe, observe_root, without_conversion, CustomSetter, Observer};
pub use traverse::traverse;
pub use value::{Key, Value};

