//! Threaded check harness for the hipcts conformance suite.
//!
//! Test bodies spawn worker threads that hammer the runtime concurrently.
//! The pieces here let those workers check results without touching the
//! test framework from more than one thread.
//!
//! # Architecture
//!
//! - **Record**: one immutable outcome of a threaded check ([`ResultRecord`])
//! - **Collector**: per-test-case, lock-free accumulation of records and a
//!   sticky failure flag ([`TestContext`])
//! - **Checks**: call-site macros and `#[track_caller]` functions that record
//!   into the collector and stop a worker once any worker has failed
//! - **Blocking stream**: pauses a work queue from host code so ordering can
//!   be observed deterministically ([`BlockingStream`])
//!
//! Around them: guarded worker spawning, launch sizing, the skip protocol,
//! child-process isolation for per-process runtime policies, and log setup.
//!
//! # Usage
//!
//! ```
//! use hipcts_harness::{check_thread, require_thread, spawn_workers, Status, TestContext};
//!
//! let mut ctx = TestContext::new();
//! spawn_workers(&ctx, 4, |index, ctx| {
//!     check_thread!(ctx, Status::Success);
//!     require_thread!(ctx, index < 4);
//! })
//! .unwrap();
//! ctx.finalize_and_assert();
//! ```

pub mod blocking;
pub mod check;
pub mod collector;
pub mod geometry;
pub mod isolation;
pub mod logging;
pub mod record;
pub mod skip;
pub mod workers;

pub use blocking::BlockingStream;
pub use check::CheckOutcome;
pub use collector::{Failure, Finalized, TestContext};
pub use geometry::{launch_blocks, num_blocks, num_blocks_thread, trimmed_launch_blocks};
pub use isolation::{run_isolated, ChildReport};
pub use record::{ResultRecord, SourceSite};
pub use skip::{is_skip_output, skip_test, SKIP_MARKER};
pub use workers::spawn_workers;

pub use hipcts_runtime::Status;
