//! Shared helpers for the `monorun` integration tests.
//!
//! - [`fake_spawner`] stands in for the package manager.
//! - [`builders`] lays out throwaway monorepos on disk.

pub mod builders;
pub mod fake_spawner;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Upper bound for any single awaited operation in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Output only shows for failing tests unless run with `--nocapture`;
/// `RUST_LOG=monorun=debug cargo test` narrows it to this crate.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("monorun=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test step timed out after {TEST_TIMEOUT:?}"))
}
