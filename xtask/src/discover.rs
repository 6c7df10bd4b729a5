//! Test case discovery

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::process::Command;
use std::sync::OnceLock;

use crate::build::TestBinary;

/// One runnable case inside a test binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub binary: TestBinary,
    /// Full path as the test harness lists it, e.g. `collector::tests::grouped`
    pub name: String,
}

fn terse_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| Regex::new(r"^(?P<name>\S+): test$").expect("valid case regex"))
}

/// Ask a test binary for its cases.
pub fn list_cases(binary: &TestBinary, filter: Option<&str>) -> Result<Vec<TestCase>> {
    let output = Command::new(&binary.path)
        .args(["--list", "--format", "terse"])
        .output()
        .with_context(|| format!("Failed to list cases of {}", binary.path.display()))?;

    if !output.status.success() {
        bail!(
            "{} --list exited with {:?}:\n{}",
            binary.path.display(),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let names = parse_case_list(&String::from_utf8_lossy(&output.stdout));
    Ok(names
        .into_iter()
        .filter(|name| filter.map_or(true, |f| name.contains(f)))
        .map(|name| TestCase {
            binary: binary.clone(),
            name,
        })
        .collect())
}

/// Case names from `--list --format terse` output. Benchmarks are dropped.
pub fn parse_case_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| terse_line().captures(line.trim_end()))
        .map(|caps| caps["name"].to_string())
        .collect()
}
