//! Tick Queue
//!
//! Deferred callbacks that run "after the current synchronous work". The
//! scheduler posts its flush here, and hosts may post their own callbacks
//! with [`next_tick`] or await [`wait`].
//!
//! The queue does not decide when a tick happens; its [`TickDriver`] does.
//! The first callback posted to an empty queue asks the driver to run the
//! queue later. Callbacks posted while the queue is running land in the next
//! tick.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use tokio::sync::oneshot;

type Callback = Box<dyn FnOnce()>;

/// How pending ticks get run.
#[derive(Clone, Default)]
pub enum TickDriver {
    /// The host calls [`run_pending`] or [`run_until_idle`] itself.
    #[default]
    Manual,
    /// Each tick is a `tokio::task::spawn_local` task.
    ///
    /// Without a Tokio runtime the queue falls back to manual driving.
    ///
    /// # Panics
    ///
    /// Inside a Tokio runtime, posting a tick outside a `LocalSet` panics,
    /// since `spawn_local` has no local task set to run on. The panic
    /// surfaces at the first write that schedules a flush.
    TokioLocal,
    /// The host supplies a function that arranges for [`run_pending`] to be
    /// called soon.
    Custom(Rc<dyn Fn()>),
}

impl fmt::Debug for TickDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickDriver::Manual => f.write_str("Manual"),
            TickDriver::TokioLocal => f.write_str("TokioLocal"),
            TickDriver::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Default)]
struct TickQueue {
    callbacks: VecDeque<Callback>,
    pending: bool,
    driver: TickDriver,
}

thread_local! {
    static TICKS: RefCell<TickQueue> = RefCell::new(TickQueue::default());
}

/// Run `callback` on the next tick.
pub fn next_tick<F>(callback: F)
where
    F: FnOnce() + 'static,
{
    let post = TICKS.with(|t| {
        let mut ticks = t.borrow_mut();
        ticks.callbacks.push_back(Box::new(callback));
        if ticks.pending {
            None
        } else {
            ticks.pending = true;
            Some(ticks.driver.clone())
        }
    });

    if let Some(driver) = post {
        post_tick(driver);
    }
}

fn post_tick(driver: TickDriver) {
    match driver {
        TickDriver::Manual => {}
        TickDriver::TokioLocal => {
            if tokio::runtime::Handle::try_current().is_ok() {
                tokio::task::spawn_local(async {
                    run_pending();
                });
            } else {
                tracing::debug!("no tokio runtime, tick left for manual driving");
            }
        }
        TickDriver::Custom(post) => post(),
    }
}

/// A future that resolves after the next tick has run.
pub fn wait() -> impl Future<Output = ()> {
    let (tx, rx) = oneshot::channel();
    next_tick(move || {
        let _ = tx.send(());
    });
    async move {
        let _ = rx.await;
    }
}

/// Run every callback queued so far. Returns how many ran.
///
/// Callbacks queued while these run are left for the next tick.
pub fn run_pending() -> usize {
    let callbacks = TICKS.with(|t| {
        let mut ticks = t.borrow_mut();
        ticks.pending = false;
        std::mem::take(&mut ticks.callbacks)
    });

    let count = callbacks.len();
    for callback in callbacks {
        callback();
    }
    if count > 0 {
        tracing::trace!(count, "ran tick");
    }
    count
}

/// Run ticks until no callbacks remain. Returns how many ran in total.
pub fn run_until_idle() -> usize {
    let mut total = 0;
    while has_pending() {
        total += run_pending();
    }
    total
}

/// Whether any callback is waiting for a tick.
pub fn has_pending() -> bool {
    TICKS.with(|t| !t.borrow().callbacks.is_empty())
}

/// Choose how ticks are run on this thread.
pub fn set_driver(driver: TickDriver) {
    TICKS.with(|t| t.borrow_mut().driver = driver);
}

/// The driver currently in use on this thread.
pub fn driver() -> TickDriver {
    TICKS.with(|t| t.borrow().driver.clone())
}
