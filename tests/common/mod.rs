//! Shared utilities for conformance tests.
//!
//! Every test runs its own in-process bus, so tests never see each other's
//! services.

use std::sync::{Arc, Once};

use openlipc::bus::{Bus, LocalBus};
use openlipc::config::LipcConfig;
use openlipc::utils::bootstrap::init_tracing;
use openlipc::utils::logging::LogMask;
use openlipc::Connection;

/// Service name used by the conformance programs.
pub const SERVICE: &str = "com.example";

static TRACING: Once = Once::new();

/// Install a tracing subscriber once per test binary.
pub fn init_logging() {
    TRACING.call_once(|| {
        // Another harness may already own the global subscriber
        let _ = init_tracing(LogMask::DEFAULT | LogMask::debug(1));
    });
}

/// Fresh in-process bus.
pub fn bus() -> Arc<dyn Bus> {
    init_logging();
    Arc::new(LocalBus::new())
}

/// Open a connection on `bus` with a short property timeout.
pub async fn open(bus: &Arc<dyn Bus>, service: Option<&str>) -> Connection {
    Connection::open_with_config(Arc::clone(bus), service, &LipcConfig::for_test())
        .await
        .expect("Failed to open connection")
}
