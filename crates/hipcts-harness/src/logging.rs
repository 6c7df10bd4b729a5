//! Log setup for test binaries.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Filter directives for test logging, e.g. `HIPCTS_LOG=hipcts_harness=debug`.
pub const LOG_ENV: &str = "HIPCTS_LOG";

static INIT: Once = Once::new();

/// Install a test-friendly subscriber. Safe to call from every test.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another subscriber may already be installed by the binary
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}
