//! Test binary building

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// A built test executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBinary {
    /// Cargo target name, e.g. `threaded_checks` or `hipcts_harness`
    pub name: String,
    pub path: PathBuf,
}

impl TestBinary {
    /// A binary given directly on the command line.
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        // Cargo appends `-<hash>` to test executables
        let name = match name.rsplit_once('-') {
            Some((base, hash)) if is_cargo_hash(hash) => base.to_string(),
            _ => name,
        };
        Self { name, path }
    }
}

fn is_cargo_hash(s: &str) -> bool {
    s.len() == 16 && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Deserialize)]
struct Message {
    reason: String,
    target: Option<Target>,
    profile: Option<Profile>,
    executable: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct Target {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    test: bool,
}

/// Build every test binary of the workspace, or of one package.
pub fn build_test_binaries(package: Option<&str>) -> Result<Vec<TestBinary>> {
    let workspace_root = find_workspace_root()?;

    info!(?package, root = %workspace_root.display(), "building test binaries");

    let mut cmd = Command::new("cargo");
    cmd.current_dir(&workspace_root)
        .args(["test", "--no-run", "--message-format=json"]);
    match package {
        Some(package) => {
            cmd.args(["-p", package]);
        }
        None => {
            cmd.arg("--workspace");
        }
    }

    let output = cmd.output().context("Failed to execute cargo test --no-run")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Test build failed:\n{}", stderr);
    }

    let binaries = parse_artifacts(&String::from_utf8_lossy(&output.stdout))?;
    if binaries.is_empty() {
        bail!("cargo produced no test executables");
    }
    for binary in &binaries {
        debug!(name = %binary.name, path = %binary.path.display(), "test binary");
    }
    Ok(binaries)
}

/// Pick the test executables out of cargo's JSON message stream.
pub fn parse_artifacts(stdout: &str) -> Result<Vec<TestBinary>> {
    let mut binaries = Vec::new();
    for line in stdout.lines().filter(|line| line.starts_with('{')) {
        let message: Message = serde_json::from_str(line)
            .with_context(|| format!("Malformed cargo message: {}", line))?;
        if message.reason != "compiler-artifact" {
            continue;
        }
        let (Some(target), Some(profile), Some(path)) =
            (message.target, message.profile, message.executable)
        else {
            continue;
        };
        if profile.test {
            binaries.push(TestBinary { name: target.name, path });
        }
    }
    Ok(binaries)
}

/// Find the workspace root by looking for Cargo.toml with [workspace]
fn find_workspace_root() -> Result<PathBuf> {
    let mut current = std::env::current_dir().context("Failed to get current directory")?;

    loop {
        if is_workspace_root(&current)? {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => bail!("Could not find workspace root"),
        }
    }
}

fn is_workspace_root(dir: &Path) -> Result<bool> {
    let cargo_toml = dir.join("Cargo.toml");
    if !cargo_toml.exists() {
        return Ok(false);
    }
    let content = std::fs::read_to_string(&cargo_toml)
        .with_context(|| format!("Failed to read {}", cargo_toml.display()))?;
    Ok(content.contains("[workspace]"))
}
