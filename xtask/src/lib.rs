//! hipcts xtask - process-level test orchestration
//!
//! Builds the suite's test binaries, enumerates their cases, and runs every
//! case in a process of its own under a timeout. A case is booked as skipped
//! when it printed the skip marker line and still exited successfully.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

mod build;
mod discover;
mod monitor;
mod report;
mod verdict;

pub use build::*;
pub use discover::*;
pub use monitor::*;
pub use report::*;
pub use verdict::*;

/// What `xtask run` and `xtask list` operate on.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Build only this package's test binaries
    pub package: Option<String>,
    /// Use these binaries as-is instead of building
    pub binaries: Vec<PathBuf>,
    /// Keep only cases whose name contains this
    pub filter: Option<String>,
}

/// Resolve the selection to runnable cases.
pub fn discover_cases(selection: &Selection) -> Result<Vec<TestCase>> {
    let binaries = if selection.binaries.is_empty() {
        build_test_binaries(selection.package.as_deref())?
    } else {
        selection
            .binaries
            .iter()
            .cloned()
            .map(TestBinary::from_path)
            .collect()
    };

    let mut cases = Vec::new();
    for binary in &binaries {
        cases.extend(list_cases(binary, selection.filter.as_deref())?);
    }
    info!(binaries = binaries.len(), cases = cases.len(), "discovered test cases");
    Ok(cases)
}

/// Run every selected case, one process each, and collect the report.
pub fn run_cases(cases: &[TestCase], timeout: Duration) -> Result<Report> {
    let started_at = Utc::now();
    let monitor = CaseMonitor::new(timeout);

    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        let result = monitor.run(case)?;
        let case_result = CaseResult::new(case, &result);
        info!(
            binary = %case_result.binary,
            case = %case_result.name,
            status = case_result.status.label(),
            duration_ms = case_result.duration_ms,
            "case finished"
        );
        results.push(case_result);
    }

    Ok(Report::new(started_at, results))
}
