//! Engine Configuration
//!
//! Configuration is per thread, like the rest of the engine state. The plain
//! settings live in [`Config`] and can be loaded from JSON; the reporting
//! hooks are closures and are installed separately.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::ReactiveError;

/// Default number of times a watcher may re-queue itself within one flush.
pub const DEFAULT_MAX_UPDATE_COUNT: usize = 100;

/// Hook invoked with `(error, context, info)` for getter, callback and
/// circular-update failures.
pub type ErrorHandler = Rc<dyn Fn(&ReactiveError, &str, &str)>;

/// Hook invoked for misuse warnings.
pub type WarnHandler = Rc<dyn Fn(&str)>;

/// Plain engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Re-queues allowed per watcher in a single flush before it is halted.
    pub max_update_count: usize,

    /// Suppress misuse warnings.
    pub silent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_update_count: DEFAULT_MAX_UPDATE_COUNT,
            silent: false,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ReactiveError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Default)]
struct Settings {
    config: Config,
    error_handler: Option<ErrorHandler>,
    warn_handler: Option<WarnHandler>,
}

thread_local! {
    static SETTINGS: RefCell<Settings> = RefCell::new(Settings::default());
}

/// Get a copy of the current configuration.
pub fn current() -> Config {
    SETTINGS.with(|s| s.borrow().config.clone())
}

/// Replace the current configuration.
pub fn set(config: Config) {
    SETTINGS.with(|s| s.borrow_mut().config = config);
}

/// Modify the current configuration in place.
pub fn update<F>(f: F)
where
    F: FnOnce(&mut Config),
{
    SETTINGS.with(|s| f(&mut s.borrow_mut().config));
}

/// Install the error hook.
pub fn set_error_handler<F>(handler: F)
where
    F: Fn(&ReactiveError, &str, &str) + 'static,
{
    SETTINGS.with(|s| s.borrow_mut().error_handler = Some(Rc::new(handler)));
}

/// Install the warning hook.
pub fn set_warn_handler<F>(handler: F)
where
    F: Fn(&str) + 'static,
{
    SETTINGS.with(|s| s.borrow_mut().warn_handler = Some(Rc::new(handler)));
}

/// Restore the default configuration and remove all hooks.
pub fn reset() {
    SETTINGS.with(|s| *s.borrow_mut() = Settings::default());
}

pub(crate) fn error_handler() -> Option<ErrorHandler> {
    SETTINGS.with(|s| s.borrow().error_handler.clone())
}

pub(crate) fn warn_handler() -> Option<WarnHandler> {
    SETTINGS.with(|s| s.borrow().warn_handler.clone())
}
