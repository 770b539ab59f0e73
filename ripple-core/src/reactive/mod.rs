//! Reactive Primitives
//!
//! This module implements the subscription side of the engine: deps,
//! watchers, and the bookkeeping that connects them.
//!
//! # Concepts
//!
//! ## Deps
//!
//! A [`Dep`] belongs to one observable slot (a reactive property, a tracked
//! cell, or an observed container as a whole). Reading the slot while a
//! watcher is evaluating subscribes that watcher to the dep. Writing the slot
//! notifies every subscriber.
//!
//! ## Watchers
//!
//! A [`Watcher`] evaluates a getter, remembers which deps it read, and
//! re-evaluates when any of them notifies. Lazy watchers back [`Computed`]
//! values; user watchers back [`watch`].
//!
//! ## The active-subscriber stack
//!
//! The [`context`] stack records which watcher is currently evaluating.
//! Nested evaluation (a computed value read inside a render watcher) pushes
//! and pops in strict LIFO order.
//!
//! # Implementation Notes
//!
//! All state is thread-local and single-threaded. Deps and watchers refer to
//! each other by id through the [`Runtime`] registry, which holds watchers
//! weakly. Nothing here keeps a watcher alive except its own handles.

pub mod context;
mod computed;
mod dep;
mod runtime;
mod subscriber;
mod tracked;
mod watch;
mod watcher;

pub use computed::{define_computed, Computed};
pub use dep::{Dep, DepId};
pub use runtime::Runtime;
pub use subscriber::{Subscriber, WatcherId};
pub use tracked::Tracked;
pub use watch::{watch, WatchHandle, WatchOptions};
pub use watcher::{parse_path, WatchCallback, WatchGetter, WatchSource, Watcher, WatcherOptions};
