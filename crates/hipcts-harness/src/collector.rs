//! Thread-safe collection of threaded check results.
//!
//! Assertion machinery in a test framework is not safe to drive from several
//! threads at once. Workers therefore never assert: they hand a
//! [`ResultRecord`] to a [`TestContext`], and the thread that joined them
//! replays the failures afterwards with [`TestContext::finalize_results`].
//!
//! # Concurrency
//!
//! - Records go into a lock-free FIFO tagged with the submitting thread, so a
//!   thread's own records keep their order and no submitter waits on another.
//! - The failure flag is a single atomic that only ever goes from false to
//!   true while a test case runs.
//! - Finalization takes `&mut self`, which the borrow checker only grants once
//!   every worker holding a reference has been joined.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use crossbeam_queue::SegQueue;
use hipcts_runtime::Status;
use tracing::{debug, error, info};

use crate::record::ResultRecord;

/// Per-test-case collector of threaded check results.
///
/// Create one per test case and share it with the workers by reference (or
/// inside an `Arc`).
#[derive(Default)]
pub struct TestContext {
    records: SegQueue<(ThreadId, ResultRecord)>,
    recorded: AtomicUsize,
    failed: AtomicBool,
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to the calling thread's sequence.
    ///
    /// Never blocks. A failing record raises the failure flag.
    pub fn add_result(&self, record: ResultRecord) {
        let failing = record.is_failure();
        let site = record.site();

        self.records.push((thread::current().id(), record));
        self.recorded.fetch_add(1, Ordering::AcqRel);

        if failing && !self.failed.swap(true, Ordering::AcqRel) {
            debug!(
                file = site.file,
                line = site.line,
                expr = site.expr,
                "first threaded check failure observed"
            );
        }
    }

    /// Whether any worker has recorded a failure in this test case.
    #[inline]
    pub fn has_failure_occurred(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Number of records submitted since the last finalization.
    pub fn record_count(&self) -> usize {
        self.recorded.load(Ordering::Acquire)
    }

    /// Drain every thread's records, turn each failing record into one
    /// [`Failure`], and reset for the next test case.
    ///
    /// Call only after all workers have been joined.
    pub fn finalize_results(&mut self) -> Finalized {
        let mut index: HashMap<ThreadId, usize> = HashMap::new();
        let mut threads: Vec<(ThreadId, Vec<ResultRecord>)> = Vec::new();

        while let Some((thread, record)) = self.records.pop() {
            let slot = *index.entry(thread).or_insert_with(|| {
                threads.push((thread, Vec::new()));
                threads.len() - 1
            });
            threads[slot].1.push(record);
        }

        let total = threads.iter().map(|(_, records)| records.len()).sum();
        let failures: Vec<Failure> = threads
            .iter()
            .flat_map(|(thread, records)| {
                records
                    .iter()
                    .filter(|record| record.is_failure())
                    .map(move |record| Failure::from_record(*thread, record))
            })
            .collect();

        *self.recorded.get_mut() = 0;
        *self.failed.get_mut() = false;

        info!(
            total,
            threads = threads.len(),
            failed = failures.len(),
            "threaded results finalized"
        );

        Finalized {
            total,
            threads: threads.len(),
            failures,
        }
    }

    /// Finalize and fail the calling test if any worker recorded a failure.
    #[track_caller]
    pub fn finalize_and_assert(&mut self) {
        self.finalize_results().assert_passed();
    }
}

/// A failing record, ready to be reported on the main thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub thread: ThreadId,
    pub file: &'static str,
    pub line: u32,
    pub expr: &'static str,
    pub expected: Status,
    pub actual: Status,
    pub condition: Option<bool>,
    pub detail: Option<String>,
}

impl Failure {
    fn from_record(thread: ThreadId, record: &ResultRecord) -> Self {
        let site = record.site();
        Self {
            thread,
            file: site.file,
            line: site.line,
            expr: site.expr,
            expected: Status::Success,
            actual: record.status(),
            condition: record.condition(),
            detail: record.detail().map(str::to_string),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.condition == Some(false) {
            writeln!(f, "Condition failed: {}", self.expr)?;
        } else {
            writeln!(f, "Error: {}", self.actual.description())?;
            writeln!(
                f,
                "    Expected Code: {} ({})",
                self.expected.name(),
                self.expected.code()
            )?;
            writeln!(
                f,
                "    Actual Code:   {} ({})",
                self.actual.name(),
                self.actual.code()
            )?;
            writeln!(f, "    Str: {}", self.expr)?;
        }
        if let Some(detail) = &self.detail {
            writeln!(f, "    Detail: {}", detail)?;
        }
        writeln!(f, "    In File: {}", self.file)?;
        write!(f, "    At line: {}", self.line)
    }
}

/// Outcome of [`TestContext::finalize_results`].
#[must_use = "failures are only reported once asserted or inspected"]
#[derive(Debug)]
pub struct Finalized {
    /// Records drained, passing and failing
    pub total: usize,
    /// Distinct threads that submitted records
    pub threads: usize,
    /// One entry per failing record
    pub failures: Vec<Failure>,
}

impl Finalized {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Report each failure and fail the calling test once if there were any.
    #[track_caller]
    pub fn assert_passed(self) {
        if self.failures.is_empty() {
            return;
        }
        for failure in &self.failures {
            error!(file = failure.file, line = failure.line, "{}", failure);
        }
        let listing: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        panic!(
            "{} of {} threaded checks failed:\n{}",
            self.failures.len(),
            self.total,
            listing.join("\n")
        );
    }
}
