//! In-process message bus.
//!
//! Routes calls and signals between connections living in the same process.
//! Ideal for tests and for embedding several services in one binary without
//! a system bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{
    check_message_size, deliver_signal, Bus, BusEndpoint, BusError, Result, SessionId, Signal,
    SignalFilter,
};
use crate::config::ResourceLimits;

/// Bookkeeping for one open session.
struct Session {
    endpoint: Weak<dyn BusEndpoint>,
    names: Vec<String>,
    filters: Vec<SignalFilter>,
}

#[derive(Default)]
struct Routing {
    sessions: HashMap<SessionId, Session>,
    /// Well-known name to owning session.
    names: HashMap<String, SessionId>,
}

/// In-process bus.
///
/// Cheap to share: wrap in `Arc` and hand the same instance to every
/// connection that should see each other.
pub struct LocalBus {
    routing: RwLock<Routing>,
    next_session: AtomicU64,
    limits: ResourceLimits,
}

impl LocalBus {
    /// Create a bus with default limits.
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    /// Create a bus with explicit limits.
    pub fn with_limits(limits: ResourceLimits) -> Self {
        info!(
            max_message_bytes = limits.max_message_bytes,
            "Local bus initialized"
        );

        Self {
            routing: RwLock::new(Routing::default()),
            next_session: AtomicU64::new(1),
            limits,
        }
    }

    /// Number of open sessions.
    pub async fn session_count(&self) -> usize {
        self.routing.read().await.sessions.len()
    }

    /// Owner of a well-known name.
    pub async fn name_owner(&self, name: &str) -> Option<SessionId> {
        self.routing.read().await.names.get(name).copied()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn connect(&self, endpoint: Weak<dyn BusEndpoint>) -> Result<SessionId> {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.routing.write().await.sessions.insert(
            session,
            Session {
                endpoint,
                names: Vec::new(),
                filters: Vec::new(),
            },
        );

        debug!(session, "Session opened");
        Ok(session)
    }

    async fn register_name(&self, session: SessionId, name: &str) -> Result<()> {
        let mut routing = self.routing.write().await;
        if !routing.sessions.contains_key(&session) {
            return Err(BusError::UnknownSession(session));
        }
        if routing.names.contains_key(name) {
            return Err(BusError::NameTaken(name.to_string()));
        }

        routing.names.insert(name.to_string(), session);
        if let Some(entry) = routing.sessions.get_mut(&session) {
            entry.names.push(name.to_string());
        }

        info!(session, name = %name, "Name registered");
        Ok(())
    }

    async fn release_name(&self, session: SessionId, name: &str) -> Result<()> {
        let mut routing = self.routing.write().await;
        match routing.names.get(name) {
            Some(owner) if *owner == session => {
                routing.names.remove(name);
                if let Some(entry) = routing.sessions.get_mut(&session) {
                    entry.names.retain(|n| n != name);
                }
                Ok(())
            }
            _ => Err(BusError::NoSuchDestination(name.to_string())),
        }
    }

    #[tracing::instrument(name = "bus.call", skip_all, fields(destination = %destination))]
    async fn call(
        &self,
        session: SessionId,
        destination: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Bytes> {
        check_message_size(payload.len(), self.limits.max_message_bytes)?;

        // Resolve the endpoint under the read lock, then release before awaiting
        let endpoint = {
            let routing = self.routing.read().await;
            if !routing.sessions.contains_key(&session) {
                return Err(BusError::UnknownSession(session));
            }
            routing
                .names
                .get(destination)
                .and_then(|owner| routing.sessions.get(owner))
                .and_then(|entry| entry.endpoint.upgrade())
        };

        let endpoint =
            endpoint.ok_or_else(|| BusError::NoSuchDestination(destination.to_string()))?;

        match tokio::time::timeout(timeout, endpoint.handle_call(payload)).await {
            Ok(reply) => Ok(reply),
            Err(_) => {
                warn!(destination = %destination, ?timeout, "Call timed out");
                Err(BusError::Timeout(timeout))
            }
        }
    }

    #[tracing::instrument(name = "bus.publish", skip_all, fields(sender = %signal.sender, member = %signal.member))]
    async fn publish(&self, session: SessionId, signal: Signal) -> Result<()> {
        check_message_size(signal.payload.len(), self.limits.max_message_bytes)?;

        let receivers: Vec<Arc<dyn BusEndpoint>> = {
            let routing = self.routing.read().await;
            if !routing.sessions.contains_key(&session) {
                return Err(BusError::UnknownSession(session));
            }
            routing
                .sessions
                .values()
                .filter(|entry| entry.filters.iter().any(|f| f.matches(&signal)))
                .filter_map(|entry| entry.endpoint.upgrade())
                .collect()
        };

        if receivers.is_empty() {
            debug!("Published signal (no receivers)");
            return Ok(());
        }

        deliver_signal(receivers, Arc::new(signal)).await;
        Ok(())
    }

    async fn subscribe(&self, session: SessionId, filter: SignalFilter) -> Result<()> {
        let mut routing = self.routing.write().await;
        let entry = routing
            .sessions
            .get_mut(&session)
            .ok_or(BusError::UnknownSession(session))?;

        if !entry.filters.contains(&filter) {
            debug!(session, sender = %filter.sender, member = ?filter.member, "Filter added");
            entry.filters.push(filter);
        }
        Ok(())
    }

    async fn unsubscribe(&self, session: SessionId, filter: &SignalFilter) -> Result<()> {
        let mut routing = self.routing.write().await;
        let entry = routing
            .sessions
            .get_mut(&session)
            .ok_or(BusError::UnknownSession(session))?;

        entry.filters.retain(|f| f != filter);
        Ok(())
    }

    async fn disconnect(&self, session: SessionId) {
        let mut routing = self.routing.write().await;
        if let Some(entry) = routing.sessions.remove(&session) {
            for name in &entry.names {
                routing.names.remove(name);
            }
            info!(session, names = ?entry.names, "Session closed");
        }
    }
}
