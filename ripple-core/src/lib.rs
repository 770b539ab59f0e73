//! Ripple Core
//!
//! This crate provides a reactive dependency-tracking and update-scheduling
//! engine. It implements:
//!
//! - Observable data (objects and arrays whose reads are tracked)
//! - Watchers that re-run when the data they read changes
//! - Cached computed values and user watches
//! - A batched, ordered update scheduler driven by a tick queue
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observer`: the value model and the reactive transform
//! - `reactive`: deps, watchers and the active-subscriber stack
//! - `scheduler`: the update queue and the tick queue
//! - `config` / `error`: engine settings, error and warning hooks
//!
//! All engine state is thread-local. Values are `Rc`-based and stay on the
//! thread that created them.
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::observer::{observe, Object, Value};
//! use ripple_core::reactive::{watch, WatchOptions};
//! use ripple_core::scheduler::tick;
//!
//! let data: Object = [("count", Value::from(0))].into_iter().collect();
//! let root = Value::from(data.clone());
//! observe(&root);
//!
//! let _handle = watch(root, "count", |new, old| {
//!     println!("count: {old:?} -> {new:?}");
//!     Ok(())
//! }, WatchOptions::default());
//!
//! data.set("count", Value::from(1));
//! data.set("count", Value::from(2));
//!
//! // One batched flush, one callback: "count: Number(0) -> Number(2)"
//! tick::run_until_idle();
//! ```

pub mod config;
pub mod error;
pub mod observer;
pub mod reactive;
pub mod scheduler;

pub use config::Config;
pub use error::{BoxError, ReactiveError};
pub use observer::{del, observe, set, Array, Object, Value};
pub use reactive::{watch, Computed, Dep, Tracked, WatchHandle, WatchOptions, Watcher, WatcherOptions};
pub use scheduler::tick::next_tick;
