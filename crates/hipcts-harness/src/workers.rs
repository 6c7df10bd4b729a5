//! Guarded worker threads.
//!
//! Spawns real OS threads for a test body and joins them before returning.
//! A worker that panics despite using the threaded checks is turned into a
//! failing record, so an unwind never crosses the thread boundary.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use anyhow::{Context, Result};
use hipcts_runtime::panic_message;
use tracing::warn;

use crate::collector::TestContext;
use crate::record::{ResultRecord, SourceSite};

/// Run `body(index, ctx)` on `count` worker threads and join them all.
///
/// Fails only if a thread could not be spawned; every thread that did start
/// is still joined before this returns.
pub fn spawn_workers<F>(ctx: &TestContext, count: usize, body: F) -> Result<()>
where
    F: Fn(usize, &TestContext) + Sync,
{
    let body = &body;
    thread::scope(|scope| {
        for index in 0..count {
            thread::Builder::new()
                .name(format!("worker-{}", index))
                .spawn_scoped(scope, move || run_guarded(ctx, index, body))
                .with_context(|| format!("failed to spawn worker thread {}", index))?;
        }
        Ok(())
    })
}

fn run_guarded<F>(ctx: &TestContext, index: usize, body: &F)
where
    F: Fn(usize, &TestContext),
{
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body(index, ctx))) {
        let message = panic_message(payload.as_ref());
        warn!(worker = index, "worker panicked: {}", message);
        ctx.add_result(
            ResultRecord::from_condition(
                SourceSite::new(file!(), line!(), "worker completed without panicking"),
                false,
            )
            .with_detail(format!("worker {} panicked: {}", index, message)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check_thread;
    use hipcts_runtime::Status;

    #[test]
    fn all_workers_run_and_join() {
        let mut ctx = TestContext::new();
        spawn_workers(&ctx, 8, |_, ctx| {
            for _ in 0..25 {
                check_thread!(ctx, Status::Success);
            }
        })
        .unwrap();
        let finalized = ctx.finalize_results();
        assert_eq!(finalized.total, 200);
        assert_eq!(finalized.threads, 8);
        assert!(finalized.passed());
    }

    #[test]
    fn panicking_worker_becomes_one_failure() {
        let mut ctx = TestContext::new();
        spawn_workers(&ctx, 4, |index, ctx| {
            check_thread!(ctx, Status::Success);
            if index == 2 {
                panic!("lost device handle");
            }
        })
        .unwrap();
        let finalized = ctx.finalize_results();
        assert_eq!(finalized.failures.len(), 1);
        let detail = finalized.failures[0].detail.as_deref().unwrap();
        assert!(detail.contains("worker 2 panicked: lost device handle"));
    }
}
