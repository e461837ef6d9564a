//! Message bus abstraction.
//!
//! This module contains:
//! - `Bus` trait: the transport a connection runs on (sessions, well-known
//!   names, blocking calls, broadcast signals)
//! - `BusEndpoint` trait: what a connection exposes to the bus for inbound
//!   calls and signals
//! - Implementations: `LocalBus` (in-process), `MockBus` (testing)

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::LipcError;

mod dispatch;
pub mod local;
pub mod mock;

pub use local::LocalBus;
pub use mock::MockBus;

pub(crate) use dispatch::{check_message_size, deliver_signal};

// ============================================================================
// Types
// ============================================================================

/// Identifier of a bus session.
pub type SessionId = u64;

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur during bus operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Name '{0}' is already owned")]
    NameTaken(String),

    #[error("No such destination: {0}")]
    NoSuchDestination(String),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Message too large: {size} bytes (limit {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Unknown session {0}")]
    UnknownSession(SessionId),

    #[error("Publish failed: {0}")]
    Publish(String),
}

impl From<BusError> for LipcError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Connection(msg) => LipcError::InitTransportFailed(msg),
            BusError::NameTaken(name) => LipcError::DuplicateServiceName(name),
            BusError::NoSuchDestination(name) => LipcError::NoSuchSource(name),
            BusError::Timeout(timeout) => LipcError::TimedOut(timeout.as_millis() as u64),
            BusError::MessageTooLarge { size, limit } => {
                LipcError::ParamsSizeExceeded { size, limit }
            }
            BusError::UnknownSession(_) => LipcError::InvalidHandle,
            BusError::Publish(msg) => LipcError::Internal(msg),
        }
    }
}

/// Broadcast message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Well-known name of the sending service.
    pub sender: String,
    /// Signal name (the event name).
    pub member: String,
    /// Encoded body.
    pub payload: Bytes,
}

/// Match rule for signals a session wants delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalFilter {
    /// Sender service name.
    pub sender: String,
    /// Signal name, `None` matches every signal from the sender.
    pub member: Option<String>,
}

impl SignalFilter {
    pub fn new(sender: impl Into<String>, member: Option<&str>) -> Self {
        Self {
            sender: sender.into(),
            member: member.map(str::to_string),
        }
    }

    /// Check if a signal matches this filter.
    pub fn matches(&self, signal: &Signal) -> bool {
        if self.sender != signal.sender {
            return false;
        }
        match &self.member {
            None => true,
            Some(member) => *member == signal.member,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Receiver side of a session.
///
/// Futures are `'static` so the bus can drive them after releasing its own
/// locks.
pub trait BusEndpoint: Send + Sync {
    /// Handle an inbound call and produce the reply body.
    fn handle_call(&self, payload: Bytes) -> BoxFuture<'static, Bytes>;

    /// Handle a signal matching one of the session's filters.
    fn handle_signal(&self, signal: Arc<Signal>) -> BoxFuture<'static, ()>;
}

/// Transport a connection runs on.
///
/// Implementations:
/// - `LocalBus`: in-process routing between connections
/// - `MockBus`: records traffic, injects failures
#[async_trait]
pub trait Bus: Send + Sync {
    /// Open a session. The bus keeps only a weak reference to the endpoint.
    async fn connect(&self, endpoint: Weak<dyn BusEndpoint>) -> Result<SessionId>;

    /// Bind a well-known name to a session.
    async fn register_name(&self, session: SessionId, name: &str) -> Result<()>;

    /// Release a well-known name.
    async fn release_name(&self, session: SessionId, name: &str) -> Result<()>;

    /// Send a call to the session owning `destination` and wait for the reply.
    async fn call(
        &self,
        session: SessionId,
        destination: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Bytes>;

    /// Broadcast a signal to every session with a matching filter.
    ///
    /// Returns once all matching endpoints have handled it.
    async fn publish(&self, session: SessionId, signal: Signal) -> Result<()>;

    /// Add a signal filter to a session.
    async fn subscribe(&self, session: SessionId, filter: SignalFilter) -> Result<()>;

    /// Remove a signal filter from a session.
    async fn unsubscribe(&self, session: SessionId, filter: &SignalFilter) -> Result<()>;

    /// Close a session, releasing its names and filters.
    async fn disconnect(&self, session: SessionId);
}
