//! Child-process isolation.
//!
//! Some runtime policies are read once per process (see
//! [`CoherencePolicy`](hipcts_runtime::CoherencePolicy)). A test that needs a
//! different policy re-executes its own test binary, filtered down to itself,
//! with the environment it needs:
//!
//! ```text
//! parent: <test-binary> <case> --exact --nocapture --test-threads=1
//!         env HIPCTS_ISOLATED_CHILD=<case> + caller's variables
//! child:  runs the body, exits 10 (pass) or 9 (fail)
//! ```
//!
//! Any other exit (a panic in the child, a case name that matched nothing)
//! is reported as a crash together with the child's output.

use std::env;
use std::process::{self, Command};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::skip::{is_skip_output, skip_test};

/// Names the case an isolated child was started for.
pub const ISOLATED_CHILD_ENV: &str = "HIPCTS_ISOLATED_CHILD";

/// Child exit code for a body that returned true.
pub const CHILD_PASS: i32 = 10;
/// Child exit code for a body that returned false.
pub const CHILD_FAIL: i32 = 9;

/// What the parent saw of a child that passed.
#[derive(Debug)]
pub struct ChildReport {
    pub stdout: String,
    pub stderr: String,
}

impl ChildReport {
    /// The child used the skip protocol.
    pub fn skipped(&self) -> bool {
        is_skip_output(&self.stdout)
    }
}

/// Whether this process is the isolated child for `case`.
pub fn is_isolated_child(case: &str) -> bool {
    env::var(ISOLATED_CHILD_ENV).is_ok_and(|value| value == case)
}

/// Run `body` in a fresh copy of the current test binary with `envs` set.
///
/// `case` must be the test's full path as the test harness lists it (for a
/// top-level function in an integration test, just its name). In the child
/// this never returns. In the parent it returns once the child exits; a
/// skip announced by the child is repeated on the parent's stdout.
pub fn run_isolated<F>(case: &str, envs: &[(&str, &str)], body: F) -> Result<ChildReport>
where
    F: FnOnce() -> bool,
{
    if is_isolated_child(case) {
        let passed = body();
        process::exit(if passed { CHILD_PASS } else { CHILD_FAIL });
    }

    let exe = env::current_exe().context("cannot locate the running test binary")?;
    let mut command = Command::new(&exe);
    command
        .args([case, "--exact", "--nocapture", "--test-threads=1"])
        .env(ISOLATED_CHILD_ENV, case);
    for (key, value) in envs {
        command.env(key, value);
    }

    info!(case, ?envs, exe = %exe.display(), "spawning isolated child");
    let output = command
        .output()
        .with_context(|| format!("failed to spawn isolated child for {}", case))?;

    let report = ChildReport {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    match output.status.code() {
        Some(CHILD_PASS) => {
            if report.skipped() {
                skip_test(&format!("isolated child for {} skipped", case));
            }
            Ok(report)
        }
        Some(CHILD_FAIL) => bail!(
            "isolated case {} reported failure\nSTDOUT:\n{}\nSTDERR:\n{}",
            case,
            report.stdout,
            report.stderr
        ),
        code => bail!(
            "isolated case {} did not complete (exit code {:?}); check that the case name \
             matches the test path\nSTDOUT:\n{}\nSTDERR:\n{}",
            case,
            code,
            report.stdout,
            report.stderr
        ),
    }
}
