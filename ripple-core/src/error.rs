//! Error types and reporting hooks.
//!
//! Nothing in the engine propagates a watcher failure to its caller. Getter
//! and callback errors are caught at the watcher boundary and handed to
//! [`handle_error`], which forwards them to the configured error hook (or logs
//! them). Misuse of the mutation API is reported through [`warn`].

use thiserror::Error;

use crate::config;
use crate::reactive::WatcherId;

/// Error type returned by user getters and callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the reactive engine.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A watcher's getter failed. The watcher keeps its previous value.
    #[error("error in getter for watcher \"{expression}\": {source}")]
    Getter {
        /// Expression or label of the failing watcher.
        expression: String,
        /// The error returned by the getter.
        #[source]
        source: BoxError,
    },

    /// A watcher's change callback failed.
    #[error("error in callback for watcher \"{expression}\": {source}")]
    Callback {
        /// Expression or label of the failing watcher.
        expression: String,
        /// The error returned by the callback.
        #[source]
        source: BoxError,
    },

    /// A watcher kept re-queueing itself within a single flush.
    #[error("you may have an infinite update loop in watcher \"{expression}\" ({count} re-queues in one flush)")]
    CircularUpdate {
        /// The halted watcher.
        watcher: WatcherId,
        /// Expression or label of the halted watcher.
        expression: String,
        /// How many times it was re-queued before being halted.
        count: usize,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Forward an error to the configured error hook.
///
/// `context` names the computation that failed (usually a watcher's
/// expression) and `info` describes the phase, e.g. `getter for watcher "a.b"`.
/// Without a hook the error is logged at error level.
pub fn handle_error(err: &ReactiveError, context: &str, info: &str) {
    match config::error_handler() {
        Some(handler) => handler(err, context, info),
        None => tracing::error!(context, info, error = %err, "reactive error"),
    }
}

/// Report a non-fatal misuse of the engine.
pub fn warn(message: &str) {
    if config::current().silent {
        return;
    }
    match config::warn_handler() {
        Some(handler) => handler(message),
        None => tracing::warn!("{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn error_messages_name_the_watcher() {
        let err = ReactiveError::Getter {
            expression: "a.b".into(),
            source: "boom".into(),
        };
        assert_eq!(err.to_string(), "error in getter for watcher \"a.b\": boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn handle_error_dispatches_to_hook() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        config::set_error_handler(move |err, context, info| {
            seen_clone
                .borrow_mut()
                .push((err.to_string(), context.to_string(), info.to_string()));
        });

        let err = ReactiveError::Callback {
            expression: "count".into(),
            source: "bad".into(),
        };
        handle_error(&err, "count", "callback for watcher \"count\"");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "count");
        assert_eq!(seen[0].2, "callback for watcher \"count\"");
        config::reset();
    }

    #[test]
    fn silent_config_suppresses_warnings() {
        let count = Rc::new(RefCell::new(0));
        let count_clone = count.clone();
        config::set_warn_handler(move |_| *count_clone.borrow_mut() += 1);

        warn("first");
        config::update(|c| c.silent = true);
        warn("second");

        assert_eq!(*count.borrow(), 1);
        config::reset();
    }
}
