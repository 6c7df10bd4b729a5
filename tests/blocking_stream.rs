//! Ordering tests built on the blocking stream coordinator.
//!
//! The host work queue stands in for a device stream: a blocked stream holds
//! back everything enqueued after the block point until the host releases it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hipcts::prelude::*;

const DRAIN_RETRIES: usize = 500;

/// Poll the queue until it reports drained, within a bounded number of tries.
fn drained_within_retries(queue: &dyn WorkQueue) -> bool {
    for _ in 0..DRAIN_RETRIES {
        if queue.query() == Status::Success {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

/// Asynchronous copy: enqueue and return immediately.
fn copy_async(queue: &HostQueue, src: Vec<i32>, dst: &Arc<Mutex<Vec<i32>>>) -> Status {
    let dst = Arc::clone(dst);
    queue.enqueue("copy_async", move || {
        let mut dst = dst.lock().unwrap();
        dst.copy_from_slice(&src);
    })
}

/// Synchronous copy: returns only after the queue, including the copy, drained.
fn copy_sync(queue: &HostQueue, src: Vec<i32>, dst: &Arc<Mutex<Vec<i32>>>) -> Status {
    let status = copy_async(queue, src, dst);
    if !status.is_success() {
        return status;
    }
    queue.synchronize()
}

#[test]
fn blocked_until_unblocked_then_drains() {
    hipcts::harness::logging::init();
    let queue = hip_check!(HostQueue::create("stream0"));
    let stream = BlockingStream::new(&queue);

    // Pending work ahead of the block point
    queue.enqueue("warmup", || thread::sleep(Duration::from_millis(5)));
    hip_check!(stream.block());

    for _ in 0..10 {
        assert!(stream.is_blocked());
        thread::sleep(Duration::from_millis(5));
    }

    stream.unblock();
    assert!(drained_within_retries(&queue));
    hip_check!(queue.synchronize());
    assert!(!stream.is_blocked());
}

#[test]
fn async_copy_waits_behind_block() {
    let queue = hip_check!(HostQueue::create("copy-async"));
    let stream = BlockingStream::new(&queue);
    let dst = Arc::new(Mutex::new(vec![0; 512]));

    hip_check!(stream.block());
    hip_check!(copy_async(&queue, vec![42; 512], &dst));

    // The copy call returned while the stream is still parked
    assert!(stream.is_blocked());
    assert!(dst.lock().unwrap().iter().all(|&v| v == 0));

    stream.unblock();
    hip_check!(queue.synchronize());
    assert!(dst.lock().unwrap().iter().all(|&v| v == 42));
}

#[test]
fn sync_copy_does_not_return_while_blocked() {
    let queue = Arc::new(hip_check!(HostQueue::create("copy-sync")));
    let dst = Arc::new(Mutex::new(vec![0; 1024]));
    let returned = Arc::new(AtomicBool::new(false));

    let stream = BlockingStream::new(queue.as_ref());
    hip_check!(stream.block());

    let copier = {
        let queue = Arc::clone(&queue);
        let dst = Arc::clone(&dst);
        let returned = Arc::clone(&returned);
        thread::spawn(move || {
            let status = copy_sync(&queue, vec![7; 1024], &dst);
            returned.store(true, Ordering::SeqCst);
            status
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!returned.load(Ordering::SeqCst));
    assert!(stream.is_blocked());

    stream.unblock();
    assert_eq!(copier.join().unwrap(), Status::Success);
    assert!(returned.load(Ordering::SeqCst));
    assert!(dst.lock().unwrap().iter().all(|&v| v == 7));
}

#[test]
fn workers_observe_blocked_stream() {
    let mut ctx = TestContext::new();
    let queue = hip_check!(HostQueue::create("shared"));
    let stream = BlockingStream::new(&queue);
    hip_check!(stream.block());

    spawn_workers(&ctx, 4, |_, ctx| {
        require_thread!(ctx, stream.is_blocked());
        check_thread!(ctx, queue.enqueue("worker_item", || {}));
        require_thread!(ctx, queue.query() == Status::ErrorNotReady);
    })
    .unwrap();

    stream.unblock();
    hip_check!(queue.synchronize());
    assert_eq!(queue.pending(), 0);
    ctx.finalize_and_assert();
}

#[test]
fn block_on_destroyed_queue_is_reported() {
    let queue = hip_check!(HostQueue::create("destroyed"));
    queue.shutdown();
    let stream = BlockingStream::new(&queue);
    hip_check_error!(stream.block(), Status::ErrorInvalidHandle);
    assert!(!stream.is_armed());
    assert!(!stream.is_blocked());
}
