//! Update Scheduler
//!
//! The scheduler batches watcher re-runs. Watchers that are notified while no
//! flush is running are collected into a queue, deduplicated, and run
//! together on the next tick.
//!
//! # Algorithm
//!
//! 1. [`queue_watcher`] ignores watchers already pending in this cycle.
//!    Otherwise it adds the watcher and, if no flush is scheduled yet,
//!    schedules one with [`next_tick`](super::tick::next_tick).
//! 2. The flush sorts the queue by watcher id. Ids follow creation order, so
//!    parents run before children and user watchers before the render
//!    watcher they feed.
//! 3. The queue is drained by index, since running a watcher may queue more.
//!    Watchers queued during the flush are spliced into sorted position after
//!    the watcher currently running, so they still run in this cycle.
//! 4. A watcher's pending flag is cleared just before it runs. If it is
//!    queued again during its own cycle more than
//!    [`max_update_count`](crate::config::Config::max_update_count) times, it
//!    is halted for the rest of the cycle and a circular-update error is
//!    reported.
//! 5. After draining, all bookkeeping is reset.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::tick;
use crate::config;
use crate::error::{self, ReactiveError};
use crate::reactive::{Runtime, WatcherId};

/// Outcome of [`UpdateScheduler::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Already pending, or halted for this cycle.
    Ignored,
    /// Added to the queue.
    Queued {
        /// No flush was scheduled yet; the caller must schedule one.
        schedule_flush: bool,
    },
}

/// Queue state of one flush cycle.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    /// Queued watchers. Sorted from `index` onward while flushing.
    queue: Vec<WatcherId>,
    /// Watchers queued and not yet run in this cycle.
    has: HashSet<WatcherId>,
    /// Re-queue counts per watcher in this cycle.
    circular: HashMap<WatcherId, usize>,
    /// Watchers that exceeded the re-queue limit in this cycle.
    halted: HashSet<WatcherId>,
    /// A flush has been scheduled and has not finished.
    waiting: bool,
    /// A flush is draining the queue.
    flushing: bool,
    /// Position of the watcher being run.
    index: usize,
}

impl UpdateScheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a watcher to the queue unless it is already pending.
    pub fn enqueue(&mut self, id: WatcherId) -> Enqueued {
        if self.halted.contains(&id) || !self.has.insert(id) {
            return Enqueued::Ignored;
        }

        if !self.flushing {
            self.queue.push(id);
        } else {
            // splice into sorted position after the running watcher; ids at
            // or below the current one land right after it
            let mut i = self.queue.len();
            while i > self.index + 1 && self.queue[i - 1] > id {
                i -= 1;
            }
            self.queue.insert(i, id);
        }

        let schedule_flush = !self.waiting;
        self.waiting = true;
        Enqueued::Queued { schedule_flush }
    }

    /// Enter the flushing state and sort the queue.
    ///
    /// Returns `false` if a flush is already running.
    pub fn begin_flush(&mut self) -> bool {
        if self.flushing {
            return false;
        }
        self.flushing = true;
        self.index = 0;
        self.queue.sort_unstable();
        true
    }

    /// Take the next watcher to run and clear its pending flag.
    ///
    /// Halted watchers are skipped. Returns `None` once the queue is drained.
    pub fn next(&mut self) -> Option<WatcherId> {
        while self.index < self.queue.len() {
            let id = self.queue[self.index];
            if self.halted.contains(&id) {
                self.index += 1;
                continue;
            }
            self.has.remove(&id);
            return Some(id);
        }
        None
    }

    /// Record that the watcher at the current index has run and advance.
    ///
    /// If the watcher re-queued itself, its re-queue count goes up. Returns
    /// the count if it now exceeds `max_update_count`, in which case the
    /// watcher is halted for the rest of the cycle.
    pub fn complete(&mut self, id: WatcherId, max_update_count: usize) -> Option<usize> {
        self.index += 1;
        if !self.has.contains(&id) {
            return None;
        }

        let count = self.circular.entry(id).or_insert(0);
        *count += 1;
        if *count > max_update_count {
            let count = *count;
            self.halted.insert(id);
            self.has.remove(&id);
            return Some(count);
        }
        None
    }

    /// Reset every piece of bookkeeping after a flush.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.has.clear();
        self.circular.clear();
        self.halted.clear();
        self.waiting = false;
        self.flushing = false;
        self.index = 0;
    }

    /// Watchers currently queued, in queue order.
    pub fn queued(&self) -> &[WatcherId] {
        &self.queue
    }

    /// Whether `id` is pending in this cycle.
    pub fn is_pending(&self, id: WatcherId) -> bool {
        self.has.contains(&id)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Whether a flush is scheduled or running.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }
}

thread_local! {
    static SCHEDULER: RefCell<UpdateScheduler> = RefCell::new(UpdateScheduler::new());
}

/// Queue a watcher to run in the next flush.
///
/// Duplicate requests within one cycle are ignored. The first request of an
/// idle cycle schedules the flush on the tick queue.
pub fn queue_watcher(id: WatcherId) {
    let outcome = SCHEDULER.with(|s| s.borrow_mut().enqueue(id));
    tracing::trace!(watcher = %id, ?outcome, "queue watcher");

    if let Enqueued::Queued {
        schedule_flush: true,
    } = outcome
    {
        tick::next_tick(flush_scheduler_queue);
    }
}

/// Run every queued watcher in ascending id order, then reset.
///
/// Normally invoked from the tick queue. Calling it while a flush is already
/// running does nothing.
pub fn flush_scheduler_queue() {
    let started = SCHEDULER.with(|s| s.borrow_mut().begin_flush());
    if !started {
        return;
    }
    let max_update_count = config::current().max_update_count;
    let mut ran = 0usize;

    while let Some(id) = SCHEDULER.with(|s| s.borrow_mut().next()) {
        let subscriber = Runtime::subscriber(id);
        if let Some(subscriber) = &subscriber {
            subscriber.run();
            ran += 1;
        }

        let halted = SCHEDULER.with(|s| s.borrow_mut().complete(id, max_update_count));
        if let Some(count) = halted {
            let expression = subscriber
                .as_ref()
                .map(|s| s.expression())
                .unwrap_or_default();
            tracing::debug!(watcher = %id, count, "halting watcher for this flush");
            let err = ReactiveError::CircularUpdate {
                watcher: id,
                expression: expression.clone(),
                count,
            };
            error::handle_error(&err, &expression, "scheduler flush");
        }
    }

    SCHEDULER.with(|s| s.borrow_mut().reset());
    tracing::trace!(ran, "flushed scheduler queue");
}

/// Whether a flush is scheduled or running.
pub fn is_waiting() -> bool {
    SCHEDULER.with(|s| s.borrow().is_waiting())
}

/// Whether the scheduler is currently draining its queue.
pub fn is_flushing() -> bool {
    SCHEDULER.with(|s| s.borrow().is_flushing())
}

/// Number of watchers queued in the current cycle.
pub fn queued_count() -> usize {
    SCHEDULER.with(|s| s.borrow().queued().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(raw: u64) -> WatcherId {
        WatcherId::from_raw(raw)
    }

    #[test]
    fn duplicate_requests_are_ignored() {
        let mut scheduler = UpdateScheduler::new();
        assert_eq!(
            scheduler.enqueue(id(3)),
            Enqueued::Queued {
                schedule_flush: true
            }
        );
        assert_eq!(scheduler.enqueue(id(3)), Enqueued::Ignored);
        assert_eq!(
            scheduler.enqueue(id(1)),
            Enqueued::Queued {
                schedule_flush: false
            }
        );
        assert_eq!(scheduler.queued(), &[id(3), id(1)]);
    }

    #[test]
    fn flush_runs_in_ascending_order() {
        let mut scheduler = UpdateScheduler::new();
        for raw in [5, 2, 9, 1] {
            scheduler.enqueue(id(raw));
        }
        assert!(scheduler.begin_flush());
        assert!(!scheduler.begin_flush());

        let mut order = Vec::new();
        while let Some(next) = scheduler.next() {
            order.push(next.raw());
            assert!(!scheduler.is_pending(next));
            scheduler.complete(next, 100);
        }
        assert_eq!(order, vec![1, 2, 5, 9]);
    }

    #[test]
    fn lower_ids_queued_during_flush_run_next() {
        let mut scheduler = UpdateScheduler::new();
        for raw in [10, 20, 30] {
            scheduler.enqueue(id(raw));
        }
        scheduler.begin_flush();

        let current = scheduler.next();
        assert_eq!(current, Some(id(10)));
        scheduler.enqueue(id(25));
        scheduler.enqueue(id(5));
        assert_eq!(scheduler.queued(), &[id(10), id(5), id(20), id(25), id(30)]);
    }

    #[test]
    fn self_requeue_past_limit_halts() {
        let mut scheduler = UpdateScheduler::new();
        scheduler.enqueue(id(1));
        scheduler.begin_flush();

        let mut runs = 0;
        let mut halted = None;
        while let Some(next) = scheduler.next() {
            runs += 1;
            scheduler.enqueue(next);
            if let Some(count) = scheduler.complete(next, 3) {
                halted = Some(count);
            }
        }
        assert_eq!(runs, 4);
        assert_eq!(halted, Some(4));
        assert_eq!(scheduler.enqueue(id(1)), Enqueued::Ignored);

        scheduler.reset();
        assert!(!scheduler.is_waiting());
        assert!(scheduler.queued().is_empty());
    }

    proptest! {
        #[test]
        fn tail_stays_sorted_during_flush(
            initial in prop::collection::vec(1u64..200, 1..20),
            inserted in prop::collection::vec(1u64..200, 0..20),
            steps in 0usize..5,
        ) {
            let mut scheduler = UpdateScheduler::new();
            for raw in &initial {
                scheduler.enqueue(id(*raw));
            }
            scheduler.begin_flush();

            let mut current = scheduler.next();
            for _ in 0..steps {
                match current {
                    Some(running) => {
                        scheduler.complete(running, 100);
                        current = scheduler.next();
                    }
                    None => break,
                }
            }

            if current.is_some() {
                for raw in &inserted {
                    scheduler.enqueue(id(*raw));
                }
                let tail = &scheduler.queued()[scheduler.index + 1..];
                prop_assert!(tail.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
