//! Connection to the message bus.
//!
//! A [`Connection`] owns one bus session, an optional well-known service
//! name, the property registry served to other services and the table of
//! event subscriptions. Everything a service does goes through it.
//!
//! ```ignore
//! let bus: Arc<dyn Bus> = Arc::new(LocalBus::new());
//! let lipc = Connection::open(bus, "com.example").await?;
//! let value = lipc.get_int_property("com.example", "int").await?;
//! lipc.close().await;
//! ```

mod endpoint;

use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bus::{Bus, BusEndpoint, BusError, SessionId};
use crate::config::{LipcConfig, ResourceLimits};
use crate::error::{LipcError, Result};
use crate::event::SubscriptionTable;
use crate::hasharray::HashArray;
use crate::property::PropertyRegistry;

pub(crate) use endpoint::Endpoint;

/// Open connection to the bus.
///
/// Closed with [`Connection::close`]. A connection dropped without closing
/// releases its session and name in the background when a runtime is
/// available.
pub struct Connection {
    pub(crate) bus: Arc<dyn Bus>,
    pub(crate) session: SessionId,
    pub(crate) endpoint: Arc<Endpoint>,
    pub(crate) timeout: Duration,
    pub(crate) limits: ResourceLimits,
    closed: bool,
}

impl Connection {
    /// Open a connection without a service name.
    ///
    /// Anonymous connections may call other services and subscribe to their
    /// events, but cannot publish events of their own.
    pub async fn open_no_name(bus: Arc<dyn Bus>) -> Result<Self> {
        Self::open_with_config(bus, None, &LipcConfig::default()).await
    }

    /// Open a connection and bind `service` as its well-known name.
    pub async fn open(bus: Arc<dyn Bus>, service: &str) -> Result<Self> {
        Self::open_with_config(bus, Some(service), &LipcConfig::default()).await
    }

    /// Open a connection with explicit configuration.
    pub async fn open_with_config(
        bus: Arc<dyn Bus>,
        service: Option<&str>,
        config: &LipcConfig,
    ) -> Result<Self> {
        if let Some(name) = service {
            validate_service_name(name, config.limits.max_service_name_len)?;
        }

        let timeout = config.timeout.resolve();
        let endpoint = Arc::new(Endpoint::new(
            service.map(str::to_string),
            config.limits.initial_string_capacity,
        ));

        let weak: Weak<dyn BusEndpoint> = Arc::downgrade(&endpoint) as Weak<dyn BusEndpoint>;
        let session = bus
            .connect(weak)
            .await
            .map_err(|e| LipcError::InitTransportFailed(e.to_string()))?;

        if let Some(name) = service {
            if let Err(e) = bus.register_name(session, name).await {
                bus.disconnect(session).await;
                warn!(service = %name, error = %e, "Failed to bind service name");
                return Err(match e {
                    BusError::NameTaken(name) => LipcError::DuplicateServiceName(name),
                    other => LipcError::InitTransportFailed(other.to_string()),
                });
            }
        }

        info!(
            session,
            service = service.unwrap_or("<anonymous>"),
            timeout_ms = timeout.as_millis() as u64,
            "Connection opened"
        );

        Ok(Self {
            bus,
            session,
            endpoint,
            timeout,
            limits: config.limits.clone(),
            closed: false,
        })
    }

    /// Close the connection.
    ///
    /// Releases the bus session and drops every registered property and
    /// subscription. No callback is invoked.
    pub async fn close(mut self) {
        if let Some(name) = self.service_name() {
            if let Err(e) = self.bus.release_name(self.session, name).await {
                debug!(service = %name, error = %e, "Name already released");
            }
        }
        self.bus.disconnect(self.session).await;

        self.endpoint.registry.clear().await;
        self.endpoint.events.clear().await;

        self.closed = true;
        info!(session = self.session, "Connection closed");
    }

    /// Bound service name, `None` for anonymous connections.
    pub fn service_name(&self) -> Option<&str> {
        self.endpoint.service_name.as_deref()
    }

    /// Wait bound applied to remote property calls.
    pub fn prop_access_timeout(&self) -> Duration {
        self.timeout
    }

    /// Bus session of this connection.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Limits in effect for this connection.
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Create an empty hash-array tagged with this connection.
    pub fn new_hasharray(&self) -> HashArray {
        HashArray::with_owner(self.session)
    }

    pub(crate) fn registry(&self) -> &PropertyRegistry {
        &self.endpoint.registry
    }

    pub(crate) fn events(&self) -> &SubscriptionTable {
        &self.endpoint.events
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        warn!(session = self.session, service = ?self.service_name(), "Releasing connection dropped without close");
        // Disconnect also releases every name the session owns
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let bus = Arc::clone(&self.bus);
                let session = self.session;
                handle.spawn(async move { bus.disconnect(session).await });
            }
            Err(_) => debug!(session = self.session, "No runtime to release dropped session"),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("service_name", &self.service_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Check a well-known service name.
///
/// Names are dot-separated with at least two elements. Each element is
/// non-empty, made of ASCII alphanumerics, `_` or `-`, and does not start
/// with a digit.
pub fn validate_service_name(name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() {
        return Err(LipcError::InvalidArg("empty service name".to_string()));
    }
    if name.len() > max_len {
        return Err(LipcError::ServiceNameTooLong {
            len: name.len(),
            limit: max_len,
        });
    }

    let elements: Vec<&str> = name.split('.').collect();
    if elements.len() < 2 {
        return Err(LipcError::InvalidArg(format!(
            "service name '{name}' needs at least two elements"
        )));
    }

    for element in elements {
        let valid = element
            .chars()
            .next()
            .is_some_and(|first| !first.is_ascii_digit())
            && element
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(LipcError::InvalidArg(format!(
                "malformed service name '{name}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
