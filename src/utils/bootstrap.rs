//! Tracing bootstrap for processes using the library.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, Registry};

use super::logging::LogMask;
use crate::config::LOG_ENV_VAR;

/// Handle for changing the log mask after initialization.
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter with one derived from `mask`.
    pub fn set_mask(&self, mask: LogMask) -> Result<(), reload::Error> {
        self.handle.reload(filter_for(mask))
    }
}

fn filter_for(mask: LogMask) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(mask.level_filter().into())
        .parse_lossy("")
}

/// Initialize tracing with the given mask.
///
/// `LIPC_LOG`, when set to a valid filter directive, takes precedence over
/// `mask`. Fails if a global subscriber is already installed.
pub fn init_tracing(mask: LogMask) -> Result<LogHandle, TryInitError> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| filter_for(mask));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(LogHandle { handle })
}
