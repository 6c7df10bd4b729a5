//! Per-case classification.

use std::time::Duration;

use hipcts_harness::is_skip_output;
use serde::Serialize;

use crate::discover::TestCase;
use crate::monitor::{MonitorOutcome, MonitorResult};

/// Lines of output kept for a case that did not pass.
const OUTPUT_TAIL_LINES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Pass,
    Fail,
    Skip,
    Timeout,
}

impl CaseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Whether this status fails the run. Skips never do.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Timeout)
    }
}

/// Classify a finished case.
///
/// A skip counts only when the process also exited successfully: a case
/// that printed the marker and then failed is a failure.
pub fn classify(outcome: MonitorOutcome, stdout: &str) -> CaseStatus {
    match outcome {
        MonitorOutcome::Timeout => CaseStatus::Timeout,
        MonitorOutcome::Exited(Some(0)) if is_skip_output(stdout) => CaseStatus::Skip,
        MonitorOutcome::Exited(Some(0)) => CaseStatus::Pass,
        MonitorOutcome::Exited(_) => CaseStatus::Fail,
    }
}

/// Everything the reports need about one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub binary: String,
    pub name: String,
    pub status: CaseStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Tail of stdout and stderr, only for failures and timeouts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CaseResult {
    pub fn new(case: &TestCase, result: &MonitorResult) -> Self {
        let status = classify(result.outcome, &result.stdout);
        let exit_code = match result.outcome {
            MonitorOutcome::Exited(code) => code,
            MonitorOutcome::Timeout => None,
        };
        let output = status
            .is_failure()
            .then(|| output_tail(&result.stdout, &result.stderr));
        Self {
            binary: case.binary.name.clone(),
            name: case.name.clone(),
            status,
            exit_code,
            duration_ms: duration_ms(result.duration),
            output,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn output_tail(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::TestBinary;
    use std::path::PathBuf;

    const SKIPPED: &str = "running 1 test\nSkipping test. Reason: no xnack\nHIP_SKIP_THIS_TEST\ntest x ... ok\n";

    #[test]
    fn classification() {
        assert_eq!(classify(MonitorOutcome::Exited(Some(0)), "test x ... ok\n"), CaseStatus::Pass);
        assert_eq!(classify(MonitorOutcome::Exited(Some(0)), SKIPPED), CaseStatus::Skip);
        assert_eq!(classify(MonitorOutcome::Exited(Some(101)), SKIPPED), CaseStatus::Fail);
        assert_eq!(classify(MonitorOutcome::Exited(None), ""), CaseStatus::Fail);
        assert_eq!(classify(MonitorOutcome::Timeout, SKIPPED), CaseStatus::Timeout);
    }

    #[test]
    fn skips_do_not_fail_the_run() {
        assert!(!CaseStatus::Skip.is_failure());
        assert!(!CaseStatus::Pass.is_failure());
        assert!(CaseStatus::Fail.is_failure());
        assert!(CaseStatus::Timeout.is_failure());
    }

    #[test]
    fn failures_keep_an_output_tail() {
        let case = TestCase {
            binary: TestBinary {
                name: "threaded_checks".to_string(),
                path: PathBuf::from("/bin/false"),
            },
            name: "finalize_fails_the_test_case".to_string(),
        };
        let stdout: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        let result = MonitorResult {
            outcome: MonitorOutcome::Exited(Some(101)),
            stdout,
            stderr: "panicked\n".to_string(),
            duration: Duration::from_millis(1500),
        };
        let case_result = CaseResult::new(&case, &result);
        assert_eq!(case_result.status, CaseStatus::Fail);
        assert_eq!(case_result.exit_code, Some(101));
        assert_eq!(case_result.duration_ms, 1500);
        let output = case_result.output.unwrap();
        assert_eq!(output.lines().count(), OUTPUT_TAIL_LINES);
        assert!(output.ends_with("panicked"));
        assert!(!output.contains("line 0\n"));
    }
}
