//! Status codes and the library error type.
//!
//! Every fallible operation returns [`Result`]. The numeric status values and
//! their string names match the platform's public header so that codes can be
//! carried across the bus and compared with values produced by other clients.

use std::fmt;

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, LipcError>;

/// Status code as carried on the wire.
///
/// The set is treated as open: values this crate does not know are preserved
/// as [`StatusCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Unknown,
    Internal,
    NoSuchSource,
    OperationNotSupported,
    OutOfMemory,
    SubscriptionFailed,
    NoSuchParam,
    NoSuchProperty,
    AccessNotAllowed,
    BufferTooSmall,
    InvalidHandle,
    InvalidArg,
    OperationNotAllowed,
    ParamsSizeExceeded,
    TimedOut,
    ServiceNameTooLong,
    DuplicateServiceName,
    InitTransportFailed,
    /// Property callback internal: callback found itself in a bad state.
    PropInvalidState,
    /// Property callback internal: backing value not initialized yet.
    PropNotInitialized,
    /// Property callback internal: unspecified callback failure.
    PropInternal,
    Other(u32),
}

impl StatusCode {
    /// Numeric value of the code.
    pub fn code(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::Unknown => 1,
            Self::Internal => 2,
            Self::NoSuchSource => 3,
            Self::OperationNotSupported => 4,
            Self::OutOfMemory => 5,
            Self::SubscriptionFailed => 6,
            Self::NoSuchParam => 7,
            Self::NoSuchProperty => 8,
            Self::AccessNotAllowed => 9,
            Self::BufferTooSmall => 10,
            Self::InvalidHandle => 11,
            Self::InvalidArg => 12,
            Self::OperationNotAllowed => 13,
            Self::ParamsSizeExceeded => 14,
            Self::TimedOut => 15,
            Self::ServiceNameTooLong => 16,
            Self::DuplicateServiceName => 17,
            Self::InitTransportFailed => 18,
            Self::PropInvalidState => 0x100,
            Self::PropNotInitialized => 0x101,
            Self::PropInternal => 0x102,
            Self::Other(code) => code,
        }
    }

    /// Decode a numeric value.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Unknown,
            2 => Self::Internal,
            3 => Self::NoSuchSource,
            4 => Self::OperationNotSupported,
            5 => Self::OutOfMemory,
            6 => Self::SubscriptionFailed,
            7 => Self::NoSuchParam,
            8 => Self::NoSuchProperty,
            9 => Self::AccessNotAllowed,
            10 => Self::BufferTooSmall,
            11 => Self::InvalidHandle,
            12 => Self::InvalidArg,
            13 => Self::OperationNotAllowed,
            14 => Self::ParamsSizeExceeded,
            15 => Self::TimedOut,
            16 => Self::ServiceNameTooLong,
            17 => Self::DuplicateServiceName,
            18 => Self::InitTransportFailed,
            0x100 => Self::PropInvalidState,
            0x101 => Self::PropNotInitialized,
            0x102 => Self::PropInternal,
            other => Self::Other(other),
        }
    }

    /// Human-readable status name, as reported by the platform library.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "lipcErrNone",
            Self::Unknown => "lipcErrUnknown",
            Self::Internal => "lipcErrInternal",
            Self::NoSuchSource => "lipcErrNoSuchSource",
            Self::OperationNotSupported => "lipcErrOperationNotSupported",
            Self::OutOfMemory => "lipcErrOutOfMemory",
            Self::SubscriptionFailed => "lipcErrSubscriptionFailed",
            Self::NoSuchParam => "lipcErrNoSuchParam",
            Self::NoSuchProperty => "lipcErrNoSuchProperty",
            Self::AccessNotAllowed => "lipcErrAccessNotAllowed",
            Self::BufferTooSmall => "lipcErrBufferTooSmall",
            Self::InvalidHandle => "lipcErrInvalidHandle",
            Self::InvalidArg => "lipcErrInvalidArg",
            Self::OperationNotAllowed => "lipcErrOperationNotAllowed",
            Self::ParamsSizeExceeded => "lipcErrParamsSizeExceeded",
            Self::TimedOut => "lipcErrTimedOut",
            Self::ServiceNameTooLong => "lipcErrServiceNameTooLong",
            Self::DuplicateServiceName => "lipcErrDuplicateServiceName",
            Self::InitTransportFailed => "lipcErrInitDBus",
            Self::PropInvalidState => "lipcPropErrInvalidState",
            Self::PropNotInitialized => "lipcPropErrNotInitialized",
            Self::PropInternal => "lipcPropErrInternal",
            Self::Other(_) => "lipcErrUnknown",
        }
    }

    /// True for the codes reserved to property callbacks.
    ///
    /// These must never reach a remote caller.
    pub fn is_callback_internal(self) -> bool {
        matches!(
            self,
            Self::PropInvalidState | Self::PropNotInitialized | Self::PropInternal
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status string for a raw numeric code.
pub fn error_string(code: u32) -> &'static str {
    StatusCode::from_code(code).as_str()
}

/// Errors returned by broker operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LipcError {
    #[error("Unknown error")]
    Unknown,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("No such source: {0}")]
    NoSuchSource(String),

    #[error("Operation not supported")]
    OperationNotSupported,

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("No such parameter")]
    NoSuchParam,

    #[error("No such property: {0}")]
    NoSuchProperty(String),

    #[error("Access not allowed: {0}")]
    AccessNotAllowed(String),

    #[error("Buffer too small, {needed} bytes required")]
    BufferTooSmall { needed: usize },

    #[error("Invalid handle")]
    InvalidHandle,

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Operation not allowed: {0}")]
    OperationNotAllowed(String),

    #[error("Parameters size exceeded: {size} bytes (limit {limit})")]
    ParamsSizeExceeded { size: usize, limit: usize },

    #[error("Timed out after {0} ms")]
    TimedOut(u64),

    #[error("Service name too long: {len} bytes (limit {limit})")]
    ServiceNameTooLong { len: usize, limit: usize },

    #[error("Duplicate service name: {0}")]
    DuplicateServiceName(String),

    #[error("Transport initialization failed: {0}")]
    InitTransportFailed(String),

    #[error("Unrecognized status {0}")]
    Other(u32),
}

impl LipcError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unknown => StatusCode::Unknown,
            Self::Internal(_) => StatusCode::Internal,
            Self::NoSuchSource(_) => StatusCode::NoSuchSource,
            Self::OperationNotSupported => StatusCode::OperationNotSupported,
            Self::OutOfMemory => StatusCode::OutOfMemory,
            Self::SubscriptionFailed(_) => StatusCode::SubscriptionFailed,
            Self::NoSuchParam => StatusCode::NoSuchParam,
            Self::NoSuchProperty(_) => StatusCode::NoSuchProperty,
            Self::AccessNotAllowed(_) => StatusCode::AccessNotAllowed,
            Self::BufferTooSmall { .. } => StatusCode::BufferTooSmall,
            Self::InvalidHandle => StatusCode::InvalidHandle,
            Self::InvalidArg(_) => StatusCode::InvalidArg,
            Self::OperationNotAllowed(_) => StatusCode::OperationNotAllowed,
            Self::ParamsSizeExceeded { .. } => StatusCode::ParamsSizeExceeded,
            Self::TimedOut(_) => StatusCode::TimedOut,
            Self::ServiceNameTooLong { .. } => StatusCode::ServiceNameTooLong,
            Self::DuplicateServiceName(_) => StatusCode::DuplicateServiceName,
            Self::InitTransportFailed(_) => StatusCode::InitTransportFailed,
            Self::Other(code) => StatusCode::Other(*code),
        }
    }

    /// Context string carried by the variant, empty when there is none.
    ///
    /// Sent alongside the status code so the remote side can rebuild the
    /// same variant with [`LipcError::from_status`].
    pub fn detail(&self) -> &str {
        match self {
            Self::Internal(msg)
            | Self::NoSuchSource(msg)
            | Self::SubscriptionFailed(msg)
            | Self::NoSuchProperty(msg)
            | Self::AccessNotAllowed(msg)
            | Self::InvalidArg(msg)
            | Self::OperationNotAllowed(msg)
            | Self::DuplicateServiceName(msg)
            | Self::InitTransportFailed(msg) => msg,
            _ => "",
        }
    }

    /// Rebuild an error from a status received from a remote dispatcher.
    ///
    /// Returns `None` for [`StatusCode::Ok`]. Callback-internal codes are
    /// folded into [`LipcError::Internal`].
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        let err = match status {
            StatusCode::Ok => return None,
            StatusCode::Unknown => Self::Unknown,
            StatusCode::Internal
            | StatusCode::PropInvalidState
            | StatusCode::PropNotInitialized
            | StatusCode::PropInternal => Self::Internal(message),
            StatusCode::NoSuchSource => Self::NoSuchSource(message),
            StatusCode::OperationNotSupported => Self::OperationNotSupported,
            StatusCode::OutOfMemory => Self::OutOfMemory,
            StatusCode::SubscriptionFailed => Self::SubscriptionFailed(message),
            StatusCode::NoSuchParam => Self::NoSuchParam,
            StatusCode::NoSuchProperty => Self::NoSuchProperty(message),
            StatusCode::AccessNotAllowed => Self::AccessNotAllowed(message),
            StatusCode::BufferTooSmall => Self::BufferTooSmall { needed: 0 },
            StatusCode::InvalidHandle => Self::InvalidHandle,
            StatusCode::InvalidArg => Self::InvalidArg(message),
            StatusCode::OperationNotAllowed => Self::OperationNotAllowed(message),
            StatusCode::ParamsSizeExceeded => Self::ParamsSizeExceeded { size: 0, limit: 0 },
            StatusCode::TimedOut => Self::TimedOut(0),
            StatusCode::ServiceNameTooLong => Self::ServiceNameTooLong { len: 0, limit: 0 },
            StatusCode::DuplicateServiceName => Self::DuplicateServiceName(message),
            StatusCode::InitTransportFailed => Self::InitTransportFailed(message),
            StatusCode::Other(code) => Self::Other(code),
        };
        Some(err)
    }
}

impl From<prost::DecodeError> for LipcError {
    fn from(err: prost::DecodeError) -> Self {
        Self::Internal(format!("malformed message: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_roundtrip_known_values() {
        for code in (0..=18).chain(0x100..=0x102) {
            assert_eq!(StatusCode::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let status = StatusCode::from_code(0x4242);
        assert_eq!(status, StatusCode::Other(0x4242));
        assert_eq!(status.code(), 0x4242);
        assert_eq!(status.as_str(), "lipcErrUnknown");
    }

    #[test]
    fn test_error_strings() {
        assert_eq!(error_string(0), "lipcErrNone");
        assert_eq!(error_string(8), "lipcErrNoSuchProperty");
        assert_eq!(error_string(18), "lipcErrInitDBus");
        assert_eq!(error_string(0x101), "lipcPropErrNotInitialized");
        assert_eq!(StatusCode::TimedOut.to_string(), "lipcErrTimedOut");
    }

    #[test]
    fn test_callback_internal_codes() {
        assert!(StatusCode::PropInvalidState.is_callback_internal());
        assert!(StatusCode::PropInternal.is_callback_internal());
        assert!(!StatusCode::Internal.is_callback_internal());
        assert!(!StatusCode::BufferTooSmall.is_callback_internal());
    }

    #[test]
    fn test_from_status_ok_is_none() {
        assert!(LipcError::from_status(StatusCode::Ok, "").is_none());
    }

    #[test]
    fn test_from_status_folds_callback_codes() {
        let err = LipcError::from_status(StatusCode::PropNotInitialized, "x").unwrap();
        assert_eq!(err.status(), StatusCode::Internal);
    }

    #[test]
    fn test_detail_round_trips_through_status() {
        let err = LipcError::AccessNotAllowed("int".to_string());
        let rebuilt = LipcError::from_status(err.status(), err.detail()).unwrap();
        assert_eq!(rebuilt, err);
        assert_eq!(LipcError::NoSuchParam.detail(), "");
    }

    #[test]
    fn test_from_status_keeps_message() {
        let err = LipcError::from_status(StatusCode::NoSuchProperty, "xxx").unwrap();
        assert_eq!(err, LipcError::NoSuchProperty("xxx".to_string()));
        assert_eq!(err.status(), StatusCode::NoSuchProperty);
    }
}
