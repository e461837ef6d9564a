//! Mock bus implementation for testing.

use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{Bus, BusEndpoint, BusError, Result, SessionId, Signal, SignalFilter};

/// Mock bus for testing.
///
/// Records published signals and owned names without delivering anything.
/// Calls always fail with [`BusError::NoSuchDestination`].
#[derive(Default)]
pub struct MockBus {
    published: RwLock<Vec<Signal>>,
    names: RwLock<HashMap<String, SessionId>>,
    filters: RwLock<Vec<(SessionId, SignalFilter)>>,
    next_session: RwLock<SessionId>,
    fail_on_connect: RwLock<bool>,
    fail_on_publish: RwLock<bool>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_connect(&self, fail: bool) {
        *self.fail_on_connect.write().await = fail;
    }

    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn take_published(&self) -> Vec<Signal> {
        std::mem::take(&mut *self.published.write().await)
    }

    pub async fn owns(&self, name: &str) -> bool {
        self.names.read().await.contains_key(name)
    }

    pub async fn filter_count(&self) -> usize {
        self.filters.read().await.len()
    }
}

#[async_trait]
impl Bus for MockBus {
    async fn connect(&self, _endpoint: Weak<dyn BusEndpoint>) -> Result<SessionId> {
        if *self.fail_on_connect.read().await {
            return Err(BusError::Connection("Mock connect failure".to_string()));
        }
        let mut next = self.next_session.write().await;
        *next += 1;
        Ok(*next)
    }

    async fn register_name(&self, session: SessionId, name: &str) -> Result<()> {
        let mut names = self.names.write().await;
        if names.contains_key(name) {
            return Err(BusError::NameTaken(name.to_string()));
        }
        names.insert(name.to_string(), session);
        Ok(())
    }

    async fn release_name(&self, _session: SessionId, name: &str) -> Result<()> {
        self.names
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BusError::NoSuchDestination(name.to_string()))
    }

    async fn call(
        &self,
        _session: SessionId,
        destination: &str,
        _payload: Bytes,
        _timeout: Duration,
    ) -> Result<Bytes> {
        Err(BusError::NoSuchDestination(destination.to_string()))
    }

    async fn publish(&self, _session: SessionId, signal: Signal) -> Result<()> {
        if *self.fail_on_publish.read().await {
            return Err(BusError::Publish("Mock publish failure".to_string()));
        }
        self.published.write().await.push(signal);
        Ok(())
    }

    async fn subscribe(&self, session: SessionId, filter: SignalFilter) -> Result<()> {
        self.filters.write().await.push((session, filter));
        Ok(())
    }

    async fn unsubscribe(&self, session: SessionId, filter: &SignalFilter) -> Result<()> {
        self.filters
            .write()
            .await
            .retain(|(s, f)| !(*s == session && f == filter));
        Ok(())
    }

    async fn disconnect(&self, session: SessionId) {
        self.names.write().await.retain(|_, owner| *owner != session);
        self.filters.write().await.retain(|(s, _)| *s != session);
    }
}
