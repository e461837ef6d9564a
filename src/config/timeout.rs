//! Property access timeout resolution.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// Timeout applied when nothing overrides it.
pub const DEFAULT_PROP_ACCESS_TIMEOUT_MS: u64 = 10_000;

/// File the platform reads the timeout override from.
pub const DEFAULT_TIMEOUT_OVERRIDE_FILE: &str = "/var/local/system/lipctimeout";

/// Timeout configuration for remote property access.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Explicit timeout in milliseconds. Takes precedence over the file.
    pub prop_access_ms: Option<u64>,
    /// File holding a decimal millisecond count.
    pub override_file: PathBuf,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            prop_access_ms: None,
            override_file: PathBuf::from(DEFAULT_TIMEOUT_OVERRIDE_FILE),
        }
    }
}

impl TimeoutConfig {
    /// Config with an explicit timeout and no file lookup.
    pub fn with_millis(ms: u64) -> Self {
        Self {
            prop_access_ms: Some(ms),
            ..Default::default()
        }
    }

    /// Resolve the effective timeout.
    ///
    /// Order: explicit value, override file, [`DEFAULT_PROP_ACCESS_TIMEOUT_MS`].
    /// Zero or unparsable values are ignored.
    pub fn resolve(&self) -> Duration {
        if let Some(ms) = self.prop_access_ms.filter(|ms| *ms > 0) {
            return Duration::from_millis(ms);
        }

        match fs::read_to_string(&self.override_file) {
            Ok(contents) => match contents.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => {
                    debug!(
                        file = %self.override_file.display(),
                        timeout_ms = ms,
                        "Using property access timeout override"
                    );
                    return Duration::from_millis(ms);
                }
                _ => {
                    warn!(
                        file = %self.override_file.display(),
                        "Ignoring malformed timeout override"
                    );
                }
            },
            Err(_) => {
                debug!(
                    file = %self.override_file.display(),
                    "No timeout override file"
                );
            }
        }

        Duration::from_millis(DEFAULT_PROP_ACCESS_TIMEOUT_MS)
    }
}
