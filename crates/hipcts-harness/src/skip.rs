//! Skip protocol.
//!
//! A test that finds its preconditions unmet prints a reason followed by
//! [`SKIP_MARKER`] on a line of its own, then returns normally. The
//! orchestrator looks for that line and books the case as skipped instead
//! of passed.
//!
//! ```text
//! Skipping test. Reason: GPU is not xnack enabled
//! HIP_SKIP_THIS_TEST
//! ```

use std::io::{self, Write};

/// Token the orchestrator greps for.
pub const SKIP_MARKER: &str = "HIP_SKIP_THIS_TEST";

/// The exact text [`skip_test`] prints.
pub fn skip_message(reason: &str) -> String {
    format!("Skipping test. Reason: {}\n{}\n", reason.trim_end(), SKIP_MARKER)
}

/// Announce that the current test is skipped. The caller still has to return.
pub fn skip_test(reason: &str) {
    print!("{}", skip_message(reason));
    let _ = io::stdout().flush();
    tracing::info!(reason = reason.trim_end(), "test skipped");
}

/// Whether `output` contains the marker as a whole line.
pub fn is_skip_output(output: &str) -> bool {
    output.lines().any(|line| line.trim() == SKIP_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ends_with_marker_line() {
        let message = skip_message("GPU is not xnack enabled\n");
        assert_eq!(
            message,
            "Skipping test. Reason: GPU is not xnack enabled\nHIP_SKIP_THIS_TEST\n"
        );
        assert!(is_skip_output(&message));
    }

    #[test]
    fn marker_must_be_its_own_line() {
        assert!(is_skip_output("running 1 test\n  HIP_SKIP_THIS_TEST \ntest x ... ok\n"));
        assert!(!is_skip_output("note: HIP_SKIP_THIS_TEST is the skip token"));
        assert!(!is_skip_output(""));
    }
}
