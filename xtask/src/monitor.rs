use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::discover::TestCase;

/// How long to wait for output after killing a timed-out case.
const PIPE_GRACE: Duration = Duration::from_secs(2);

/// Outcome of monitoring one case process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The process exited on its own. Contains the exit code if there was one.
    Exited(Option<i32>),
    /// The timeout was exceeded and the process was killed.
    Timeout,
}

/// Result returned by `CaseMonitor::run()`.
#[derive(Debug)]
pub struct MonitorResult {
    pub outcome: MonitorOutcome,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Runs a single test case in its own process and watches it.
pub struct CaseMonitor {
    /// Maximum time to wait before killing the case.
    pub timeout: Duration,
    /// How often to check whether the process exited.
    pub poll_interval: Duration,
}

impl CaseMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(20),
        }
    }

    /// Start `case` filtered down to itself and wait for it, killing it once
    /// the timeout passes.
    pub fn run(&self, case: &TestCase) -> Result<MonitorResult> {
        let mut command = Command::new(&case.binary.path);
        command
            .args([case.name.as_str(), "--exact", "--nocapture", "--test-threads=1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(binary = %case.binary.name, case = %case.name, "starting case");
        let mut child = command.spawn().with_context(|| {
            format!("Failed to start {} {}", case.binary.path.display(), case.name)
        })?;
        self.monitor(&mut child)
    }

    /// Wait for an already spawned child with piped output.
    ///
    /// The pipes are drained on helper threads so a chatty child cannot
    /// block on a full pipe while it is being polled.
    pub fn monitor(&self, child: &mut Child) -> Result<MonitorResult> {
        let start = Instant::now();
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let outcome = loop {
            if let Some(status) = child.try_wait().context("Failed to poll case process")? {
                break MonitorOutcome::Exited(status.code());
            }
            if start.elapsed() >= self.timeout {
                warn!(pid = child.id(), timeout = ?self.timeout, "case timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                break MonitorOutcome::Timeout;
            }
            thread::sleep(self.poll_interval);
        };

        // A killed case may leave grandchildren holding the pipes open
        let grace = match outcome {
            MonitorOutcome::Timeout => Some(PIPE_GRACE),
            MonitorOutcome::Exited(_) => None,
        };
        Ok(MonitorResult {
            outcome,
            stdout: collect(stdout, grace),
            stderr: collect(stderr, grace),
            duration: start.elapsed(),
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>, grace: Option<Duration>) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    if let Some(grace) = grace {
        let deadline = Instant::now() + grace;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return String::new();
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
    handle.join().unwrap_or_default()
}
