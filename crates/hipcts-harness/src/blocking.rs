//! Host-controlled pausing of a work queue.
//!
//! [`BlockingStream::block`] enqueues a callback that parks the queue until
//! the host calls [`BlockingStream::unblock`]. Everything enqueued after the
//! callback is held back, which lets a test observe whether an operation
//! returned before or after the work ahead of it finished.
//!
//! The parked callback spins with `yield_now` instead of waiting on a
//! condition variable: it runs in the runtime's completion-callback context,
//! which is not guaranteed to support blocking primitives.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --block()--> Blocked --unblock()--> Idle
//! ```
//!
//! Each `block()` whose enqueue succeeded takes a ticket. `unblock()` releases every ticket issued so
//! far, so re-arming right after a release cannot re-park a callback that has
//! not yet noticed it was released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use hipcts_runtime::{Status, WorkQueue};
use tracing::debug;

/// Ticket of a callback whose enqueue has not been confirmed yet.
const UNASSIGNED: u64 = u64::MAX;

#[derive(Default)]
struct Gate {
    /// Tickets handed out by `block`
    armed: AtomicU64,
    /// Highest ticket released by `unblock`
    released: AtomicU64,
}

/// Pauses and resumes one work queue from host code.
pub struct BlockingStream<'q, Q: WorkQueue + ?Sized> {
    queue: &'q Q,
    gate: Arc<Gate>,
}

impl<'q, Q: WorkQueue + ?Sized> BlockingStream<'q, Q> {
    pub fn new(queue: &'q Q) -> Self {
        Self {
            queue,
            gate: Arc::new(Gate::default()),
        }
    }

    /// Park the queue at its current tail until [`unblock`](Self::unblock).
    ///
    /// Returns the queue's status for the enqueue. Anything but `Success`
    /// should fail the test; nothing was parked in that case.
    pub fn block(&self) -> Status {
        // Filled in once the enqueue succeeded; until then the callback waits
        let slot = Arc::new(AtomicU64::new(UNASSIGNED));
        let gate = Arc::clone(&self.gate);
        let callback_slot = Arc::clone(&slot);

        let status = self.queue.add_callback(Box::new(move |_| {
            while gate.released.load(Ordering::Acquire) < callback_slot.load(Ordering::Acquire) {
                thread::yield_now();
            }
        }));
        if status != Status::Success {
            debug!(%status, "blocking callback rejected");
            return status;
        }

        let ticket = self.gate.armed.fetch_add(1, Ordering::AcqRel) + 1;
        slot.store(ticket, Ordering::Release);
        debug!(ticket, "blocking callback enqueued");
        status
    }

    /// Release every callback armed so far.
    pub fn unblock(&self) {
        let armed = self.gate.armed.load(Ordering::Acquire);
        self.gate.released.fetch_max(armed, Ordering::AcqRel);
        debug!(released = armed, "blocking callbacks released");
    }

    /// Point-in-time probe: does the queue still report unfinished work?
    ///
    /// Not synchronized with `block`/`unblock`; a `true` shortly after
    /// `unblock` only means the callback has not noticed yet.
    pub fn is_blocked(&self) -> bool {
        self.queue.query() == Status::ErrorNotReady
    }

    /// Whether a `block()` is still waiting for its `unblock()`.
    pub fn is_armed(&self) -> bool {
        self.gate.armed.load(Ordering::Acquire) > self.gate.released.load(Ordering::Acquire)
    }

    pub fn queue(&self) -> &'q Q {
        self.queue
    }
}

impl<Q: WorkQueue + ?Sized> Drop for BlockingStream<'_, Q> {
    fn drop(&mut self) {
        if self.is_armed() {
            self.unblock();
        }
    }
}
