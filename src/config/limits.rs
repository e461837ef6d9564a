//! Resource limits for bus messages and property values.
//!
//! Defaults mirror the platform's message bus: 64 KB per message and
//! 255-byte well-known names. The in-process bus enforces the same limits so
//! code tested locally behaves as it would against the platform bus.

use serde::Deserialize;

/// Default maximum encoded size of a single bus message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Default maximum length of a service name.
pub const DEFAULT_MAX_SERVICE_NAME_LEN: usize = 255;

/// Default capacity offered to a string getter on its first invocation.
pub const DEFAULT_INITIAL_STRING_CAPACITY: usize = 256;

/// Resource limits for message processing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum encoded size of a published event or a property call.
    ///
    /// Default: 65,536 (64 KB).
    pub max_message_bytes: usize,

    /// Maximum service name length in bytes.
    ///
    /// Default: 255.
    pub max_service_name_len: usize,

    /// Buffer capacity advertised to string getters before any growth.
    ///
    /// Default: 256.
    pub initial_string_capacity: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            max_service_name_len: DEFAULT_MAX_SERVICE_NAME_LEN,
            initial_string_capacity: DEFAULT_INITIAL_STRING_CAPACITY,
        }
    }
}
