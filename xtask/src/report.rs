//! Run reports: a human-readable summary table, KTAP, and JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::verdict::{CaseResult, CaseStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Summary,
    Ktap,
    Json,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timed_out: usize,
}

/// Results of one orchestrator run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub counts: Counts,
    pub cases: Vec<CaseResult>,
}

impl Report {
    pub fn new(started_at: DateTime<Utc>, cases: Vec<CaseResult>) -> Self {
        let duration_ms = u64::try_from((Utc::now() - started_at).num_milliseconds()).unwrap_or(0);
        let mut counts = Counts {
            total: cases.len(),
            ..Counts::default()
        };
        for case in &cases {
            match case.status {
                CaseStatus::Pass => counts.passed += 1,
                CaseStatus::Fail => counts.failed += 1,
                CaseStatus::Skip => counts.skipped += 1,
                CaseStatus::Timeout => counts.timed_out += 1,
            }
        }
        Self {
            started_at,
            duration_ms,
            counts,
            cases,
        }
    }

    /// No case failed or timed out. Skips do not count against the run.
    pub fn all_passed(&self) -> bool {
        self.counts.failed == 0 && self.counts.timed_out == 0
    }

    pub fn render(&self, format: Format) -> Result<String> {
        match format {
            Format::Summary => Ok(self.render_summary()),
            Format::Ktap => Ok(self.render_ktap()),
            Format::Json => self.render_json(),
        }
    }

    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let width = self
            .cases
            .iter()
            .map(|case| case.binary.len() + case.name.len() + 2)
            .max()
            .unwrap_or(4)
            .max(4);

        out.push_str(&format!(
            "hipcts run started {}\n\n",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!(
            "{:<width$}  {:<8}  {:>10}\n",
            "Case",
            "Status",
            "Duration",
            width = width
        ));
        out.push_str(&format!("{}\n", "-".repeat(width + 22)));

        for case in &self.cases {
            let name = format!("{}::{}", case.binary, case.name);
            out.push_str(&format!(
                "{:<width$}  {:<8}  {:>7} ms\n",
                name,
                case.status.label(),
                case.duration_ms,
                width = width
            ));
        }

        let failing = self.cases.iter().filter(|case| case.status.is_failure());
        for case in failing {
            out.push_str(&format!(
                "\n---- {}::{} ({}) ----\n",
                case.binary,
                case.name,
                case.status.label()
            ));
            if let Some(output) = &case.output {
                out.push_str(output);
                out.push('\n');
            }
        }

        let c = &self.counts;
        out.push('\n');
        out.push_str(&format!(
            "Total: {}  Passed: {}  Failed: {}  Skipped: {}  Timed out: {}  ({} ms)\n",
            c.total, c.passed, c.failed, c.skipped, c.timed_out, self.duration_ms
        ));
        if !self.all_passed() {
            out.push_str(&format!(
                "RESULT: FAIL ({} failed, {} timed out)\n",
                c.failed, c.timed_out
            ));
        } else if c.total == 0 {
            out.push_str("RESULT: NO TESTS RUN\n");
        } else {
            out.push_str(&format!(
                "RESULT: PASS ({}/{} passed, {} skipped)\n",
                c.passed, c.total, c.skipped
            ));
        }
        out
    }

    pub fn render_ktap(&self) -> String {
        let mut out = String::from("KTAP version 1\n");
        out.push_str(&format!("1..{}\n", self.cases.len()));

        for (index, case) in self.cases.iter().enumerate() {
            let seq = index + 1;
            let name = format!("{}::{}", case.binary, case.name);
            let line = match case.status {
                CaseStatus::Pass => format!("ok {} {}", seq, name),
                CaseStatus::Skip => format!("ok {} {} # SKIP", seq, name),
                CaseStatus::Fail => match case.exit_code {
                    Some(code) => format!("not ok {} {} # FAIL exit_code={}", seq, name, code),
                    None => format!("not ok {} {} # FAIL signal", seq, name),
                },
                CaseStatus::Timeout => format!("not ok {} {} # TIMEOUT", seq, name),
            };
            out.push_str(&line);
            out.push('\n');
        }

        out.push_str(&format!(
            "# {} passed, {} failed, {} skipped, {} timed out\n",
            self.counts.passed, self.counts.failed, self.counts.skipped, self.counts.timed_out
        ));
        out
    }

    pub fn render_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(name: &str, status: CaseStatus, exit_code: Option<i32>) -> CaseResult {
        CaseResult {
            binary: "skip_protocol".to_string(),
            name: name.to_string(),
            status,
            exit_code,
            duration_ms: 12,
            output: status.is_failure().then(|| "thread panicked".to_string()),
        }
    }

    fn sample() -> Report {
        Report::new(
            Utc::now(),
            vec![
                case("present_capability_runs", CaseStatus::Pass, Some(0)),
                case("missing_capability_skips", CaseStatus::Skip, Some(0)),
                case("gfx11_timing", CaseStatus::Fail, Some(101)),
                case("hangs", CaseStatus::Timeout, None),
            ],
        )
    }

    #[test]
    fn counts_and_exit_policy() {
        let report = sample();
        assert_eq!(
            report.counts,
            Counts {
                total: 4,
                passed: 1,
                failed: 1,
                skipped: 1,
                timed_out: 1,
            }
        );
        assert!(!report.all_passed());

        let only_skips = Report::new(
            Utc::now(),
            vec![case("missing_capability_skips", CaseStatus::Skip, Some(0))],
        );
        assert!(only_skips.all_passed());
    }

    #[test]
    fn ktap_lines() {
        let ktap = sample().render_ktap();
        let lines: Vec<&str> = ktap.lines().collect();
        assert_eq!(lines[0], "KTAP version 1");
        assert_eq!(lines[1], "1..4");
        assert_eq!(lines[2], "ok 1 skip_protocol::present_capability_runs");
        assert_eq!(lines[3], "ok 2 skip_protocol::missing_capability_skips # SKIP");
        assert_eq!(lines[4], "not ok 3 skip_protocol::gfx11_timing # FAIL exit_code=101");
        assert_eq!(lines[5], "not ok 4 skip_protocol::hangs # TIMEOUT");
        assert_eq!(lines[6], "# 1 passed, 1 failed, 1 skipped, 1 timed out");
    }

    #[test]
    fn summary_lists_failure_output() {
        let summary = sample().render_summary();
        assert!(summary.contains("---- skip_protocol::gfx11_timing (FAIL) ----\nthread panicked"));
        assert!(summary.contains("RESULT: FAIL (1 failed, 1 timed out)"));
    }

    #[test]
    fn json_report() {
        let json = sample().render_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["counts"]["skipped"], 1);
        assert_eq!(value["cases"][1]["status"], "SKIP");
        assert_eq!(value["cases"][3]["exit_code"], serde_json::Value::Null);
        assert!(value["cases"][0].get("output").is_none());
    }
}
