//! Test support for fetch-component.
//!
//! Provides a scripted [`MockTransport`], a wiremock-backed [`TestHttpServer`]
//! and one-time tracing setup shared by the integration tests.

pub mod mock_transport;
pub mod network;

pub use mock_transport::{MockReply, MockTransport};
pub use network::TestHttpServer;

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests. Safe to call from every test.
pub fn init() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,fetch_component=debug"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    });

    Lazy::force(&INIT);
}
