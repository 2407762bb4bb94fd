//! Log output for tests.

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Output goes
/// through the test harness so it is captured per test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber installed by an earlier test is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
