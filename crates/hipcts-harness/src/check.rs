//! Check operations.
//!
//! Two families:
//!
//! - **Threaded** ([`check_thread!`], [`require_thread!`], and the
//!   [`TestContext::check`] / [`TestContext::require`] functions): for code
//!   running on a worker thread. They record into a [`TestContext`] and never
//!   panic.
//! - **Main thread** ([`hip_check!`], [`hip_check_error!`]): fail the test
//!   immediately by panicking.
//!
//! Every threaded check first looks at [`TestContext::has_failure_occurred`].
//! Once any worker has failed, the check returns from the enclosing function
//! without evaluating its expression and without recording anything. Checks
//! skipped this way leave no trace, so a second, unrelated bug on another
//! thread can go unreported until the first one is fixed.

use std::ops::ControlFlow;

use hipcts_runtime::Status;

use crate::collector::TestContext;
use crate::record::{ResultRecord, SourceSite};

/// Something a runtime call returns: a bare [`Status`] or a `Result` carrying
/// a value on success.
pub trait CheckOutcome {
    type Value;

    /// The status to record, and the value to continue with if there is one.
    fn into_parts(self) -> (Status, Option<Self::Value>);
}

impl CheckOutcome for Status {
    type Value = ();

    fn into_parts(self) -> (Status, Option<()>) {
        (self, Some(()))
    }
}

impl<T> CheckOutcome for Result<T, Status> {
    type Value = T;

    fn into_parts(self) -> (Status, Option<T>) {
        match self {
            Ok(value) => (Status::Success, Some(value)),
            Err(status) => (status, None),
        }
    }
}

impl TestContext {
    /// Threaded status check at an explicit site.
    ///
    /// Breaks without calling `call` if a failure was already recorded.
    /// Otherwise records the outcome, success included. A bare `Status`
    /// continues even when it failed (the next check stops the worker); a
    /// `Result` that failed breaks because there is no value to go on with.
    pub fn check_at<R, F>(&self, site: SourceSite, call: F) -> ControlFlow<(), R::Value>
    where
        R: CheckOutcome,
        F: FnOnce() -> R,
    {
        if self.has_failure_occurred() {
            return ControlFlow::Break(());
        }
        let (status, value) = call().into_parts();
        self.add_result(ResultRecord::from_status(site, status));
        match value {
            Some(value) => ControlFlow::Continue(value),
            None => ControlFlow::Break(()),
        }
    }

    /// Threaded condition check at an explicit site.
    pub fn require_at<F>(&self, site: SourceSite, condition: F) -> ControlFlow<()>
    where
        F: FnOnce() -> bool,
    {
        if self.has_failure_occurred() {
            return ControlFlow::Break(());
        }
        let outcome = condition();
        self.add_result(ResultRecord::from_condition(site, outcome));
        ControlFlow::Continue(())
    }

    /// [`check_at`](Self::check_at) with the caller's location.
    ///
    /// ```
    /// use std::ops::ControlFlow;
    /// use hipcts_harness::{Status, TestContext};
    ///
    /// fn worker(ctx: &TestContext) -> ControlFlow<()> {
    ///     let value = ctx.check("lookup()", || Ok::<u32, Status>(7))?;
    ///     ctx.require("value == 7", || value == 7)?;
    ///     ControlFlow::Continue(())
    /// }
    ///
    /// let mut ctx = TestContext::new();
    /// let _ = worker(&ctx);
    /// assert!(ctx.finalize_results().passed());
    /// ```
    #[track_caller]
    pub fn check<R, F>(&self, expr: &'static str, call: F) -> ControlFlow<(), R::Value>
    where
        R: CheckOutcome,
        F: FnOnce() -> R,
    {
        self.check_at(SourceSite::caller(expr), call)
    }

    /// [`require_at`](Self::require_at) with the caller's location.
    #[track_caller]
    pub fn require<F>(&self, expr: &'static str, condition: F) -> ControlFlow<()>
    where
        F: FnOnce() -> bool,
    {
        self.require_at(SourceSite::caller(expr), condition)
    }
}

/// Statuses a main-thread check lets through.
pub fn passes_main_check(status: Status) -> bool {
    matches!(
        status,
        Status::Success | Status::ErrorPeerAccessAlreadyEnabled
    )
}

#[doc(hidden)]
#[track_caller]
pub fn __main_check<R: CheckOutcome>(outcome: R, site: SourceSite) -> R::Value {
    let (status, value) = outcome.into_parts();
    match value {
        Some(value) if passes_main_check(status) => value,
        _ => panic!(
            "Error: {}\n    Code: {} ({})\n    Str: {}\n    In File: {}\n    At line: {}",
            status.description(),
            status.name(),
            status.code(),
            site.expr,
            site.file,
            site.line
        ),
    }
}

#[doc(hidden)]
#[track_caller]
pub fn __expect_status<R: CheckOutcome>(outcome: R, expected: Status, site: SourceSite) {
    let (actual, _) = outcome.into_parts();
    if actual != expected {
        panic!(
            "Matching Errors:\n    Expected Error: {}\n    Expected Code: {} ({})\n    \
             Actual Error:   {}\n    Actual Code:   {} ({})\n    Str: {}\n    In File: {}\n    At line: {}",
            expected.description(),
            expected.name(),
            expected.code(),
            actual.description(),
            actual.name(),
            actual.code(),
            site.expr,
            site.file,
            site.line
        );
    }
}

/// Threaded status check.
///
/// Records the outcome of `$call` in `$ctx` and evaluates to the call's
/// value. Returns from the enclosing function (with `$ret`, default `()`)
/// without evaluating `$call` if a failure was already recorded, or after
/// recording a `Result` that failed.
///
/// ```
/// use hipcts_harness::{check_thread, Status, TestContext};
///
/// fn worker(ctx: &TestContext) {
///     check_thread!(ctx, Status::Success);
///     let count = check_thread!(ctx, Ok::<usize, Status>(3));
///     assert_eq!(count, 3);
/// }
///
/// let mut ctx = TestContext::new();
/// worker(&ctx);
/// assert_eq!(ctx.finalize_results().total, 2);
/// ```
#[macro_export]
macro_rules! check_thread {
    ($ctx:expr, $call:expr) => {
        $crate::check_thread!($ctx, $call; ())
    };
    ($ctx:expr, $call:expr; $ret:expr) => {
        match $crate::TestContext::check_at(
            &$ctx,
            $crate::SourceSite::new(file!(), line!(), stringify!($call)),
            || $call,
        ) {
            ::core::ops::ControlFlow::Continue(value) => value,
            ::core::ops::ControlFlow::Break(()) => return $ret,
        }
    };
}

/// Threaded condition check.
///
/// Records whether `$cond` held. Returns from the enclosing function (with
/// `$ret`, default `()`) without evaluating `$cond` if a failure was already
/// recorded.
#[macro_export]
macro_rules! require_thread {
    ($ctx:expr, $cond:expr) => {
        $crate::require_thread!($ctx, $cond; ())
    };
    ($ctx:expr, $cond:expr; $ret:expr) => {
        if let ::core::ops::ControlFlow::Break(()) = $crate::TestContext::require_at(
            &$ctx,
            $crate::SourceSite::new(file!(), line!(), stringify!($cond)),
            || $cond,
        ) {
            return $ret;
        }
    };
}

/// Main-thread status check.
///
/// Panics unless `$call` returned `Success` (or
/// `ErrorPeerAccessAlreadyEnabled`). Evaluates to the call's value.
#[macro_export]
macro_rules! hip_check {
    ($call:expr) => {
        $crate::check::__main_check(
            $call,
            $crate::SourceSite::new(file!(), line!(), stringify!($call)),
        )
    };
}

/// Main-thread check that `$call` returned exactly `$expected`.
#[macro_export]
macro_rules! hip_check_error {
    ($call:expr, $expected:expr) => {
        $crate::check::__expect_status(
            $call,
            $expected,
            $crate::SourceSite::new(file!(), line!(), stringify!($call)),
        )
    };
}
