//! Asynchronous work queues.
//!
//! [`WorkQueue`] is the contract the harness relies on: items run in
//! submission order on some execution agent the caller does not control,
//! the host can ask whether everything submitted so far has finished, and it
//! can block until it has.
//!
//! [`HostQueue`] honours that contract with a single host worker thread, so
//! ordering and blocking behaviour can be exercised without a device.
//!
//! # Architecture
//!
//! - Items live in a lock-free FIFO; a counter tracks submitted but
//!   unfinished items.
//! - The worker parks when the FIFO is empty and is unparked on submission.
//! - `synchronize` sleeps on a condition variable that the worker signals
//!   when the counter drops to zero.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, Thread};

use crossbeam_queue::SegQueue;
use tracing::{debug, warn};

use crate::{panic_message, Status};

/// A completion callback. It receives the queue's status at the point the
/// callback runs.
pub type Callback = Box<dyn FnOnce(Status) + Send + 'static>;

/// An in-order asynchronous work queue.
pub trait WorkQueue: Send + Sync {
    /// Enqueue `callback` to run once everything submitted before it has
    /// finished.
    fn add_callback(&self, callback: Callback) -> Status;

    /// `Success` if every submitted item has finished, `ErrorNotReady` if
    /// work is still outstanding.
    fn query(&self) -> Status;

    /// Block until every submitted item has finished.
    fn synchronize(&self) -> Status;
}

struct Work {
    func: Callback,
    name: &'static str,
}

struct Shared {
    items: SegQueue<Work>,
    /// Submitted but not yet finished
    pending: AtomicUsize,
    /// Set once the submission gate is closed
    shutdown: AtomicBool,
    /// First asynchronous failure, returned by `synchronize`
    sticky: AtomicI32,
    /// Guards the drained condition; `true` while submissions are accepted
    gate: Mutex<bool>,
    drained: Condvar,
    name: String,
}

impl Shared {
    fn lock_gate(&self) -> MutexGuard<'_, bool> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(&self, work: Work) {
        let status = Status::from_code(self.sticky.load(Ordering::Acquire));
        let Work { func, name } = work;

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| func(status))) {
            warn!(
                queue = %self.name,
                work = name,
                "queued work panicked: {}",
                panic_message(payload.as_ref())
            );
            let _ = self.sticky.compare_exchange(
                Status::Success.code(),
                Status::ErrorLaunchFailure.code(),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }

        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Notify under the lock so a waiter cannot miss the transition
            let _gate = self.lock_gate();
            self.drained.notify_all();
        }
    }
}

/// In-order work queue backed by one host thread.
pub struct HostQueue {
    shared: Arc<Shared>,
    thread: Thread,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HostQueue {
    /// Create a queue and start its worker thread.
    ///
    /// Fails with `ErrorOutOfMemory` if the worker thread cannot be spawned.
    pub fn create(name: &str) -> Result<HostQueue, Status> {
        let shared = Arc::new(Shared {
            items: SegQueue::new(),
            pending: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            sticky: AtomicI32::new(Status::Success.code()),
            gate: Mutex::new(true),
            drained: Condvar::new(),
            name: name.to_string(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(worker_shared))
            .map_err(|_| Status::ErrorOutOfMemory)?;

        debug!(queue = name, "work queue worker started");

        Ok(HostQueue {
            shared,
            thread: handle.thread().clone(),
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Enqueue a unit of work. Returns `ErrorInvalidHandle` after shutdown.
    pub fn enqueue<F>(&self, name: &'static str, func: F) -> Status
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Work {
            func: Box::new(move |_| func()),
            name,
        })
    }

    /// Number of submitted items that have not finished yet.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Stop accepting work, let the worker drain what was already queued,
    /// and join it. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut open = self.shared.lock_gate();
            *open = false;
        }
        self.shared.shutdown.store(true, Ordering::Release);
        self.thread.unpark();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
            debug!(queue = %self.shared.name, "work queue worker stopped");
        }
    }

    fn submit(&self, work: Work) -> Status {
        {
            let open = self.shared.lock_gate();
            if !*open {
                return Status::ErrorInvalidHandle;
            }
            self.shared.pending.fetch_add(1, Ordering::AcqRel);
            self.shared.items.push(work);
        }
        self.thread.unpark();
        Status::Success
    }
}

impl WorkQueue for HostQueue {
    fn add_callback(&self, callback: Callback) -> Status {
        self.submit(Work {
            func: callback,
            name: "callback",
        })
    }

    fn query(&self) -> Status {
        if self.pending() == 0 {
            Status::Success
        } else {
            Status::ErrorNotReady
        }
    }

    /// Must not be called from inside an item running on this queue.
    fn synchronize(&self) -> Status {
        let mut gate = self.shared.lock_gate();
        while self.shared.pending.load(Ordering::Acquire) > 0 {
            gate = self
                .shared
                .drained
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(gate);
        Status::from_code(self.shared.sticky.load(Ordering::Acquire))
    }
}

impl Drop for HostQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        match shared.items.pop() {
            Some(work) => shared.execute(work),
            None => {
                if shared.shutdown.load(Ordering::Acquire) {
                    // Anything pushed before the gate closed is visible now
                    while let Some(work) = shared.items.pop() {
                        shared.execute(work);
                    }
                    break;
                }
                thread::park();
            }
        }
    }
}
