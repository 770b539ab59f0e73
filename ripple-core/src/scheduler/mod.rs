//! Batched update scheduling.
//!
//! Non-sync watchers do not re-run when notified. They are queued in the
//! scheduler queue and run together in one flush, which the [`tick`] queue runs
//! after the current synchronous work.

mod queue;
pub mod tick;

pub use queue::{
    flush_scheduler_queue, is_flushing, is_waiting, queue_watcher, queued_count, Enqueued,
    UpdateScheduler,
};
pub use tick::TickDriver;
