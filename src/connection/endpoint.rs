//! Inbound side of a connection.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::bus::{BusEndpoint, Signal};
use crate::event::{self, SubscriptionTable};
use crate::property::{self, PropertyRegistry};

/// State shared between a [`super::Connection`] and the bus.
///
/// The bus holds this only weakly; the connection owns it.
pub(crate) struct Endpoint {
    pub(crate) service_name: Option<String>,
    pub(crate) registry: Arc<PropertyRegistry>,
    pub(crate) events: Arc<SubscriptionTable>,
    initial_string_capacity: usize,
}

impl Endpoint {
    pub(crate) fn new(service_name: Option<String>, initial_string_capacity: usize) -> Self {
        Self {
            service_name,
            registry: Arc::new(PropertyRegistry::new()),
            events: Arc::new(SubscriptionTable::new()),
            initial_string_capacity,
        }
    }
}

impl BusEndpoint for Endpoint {
    fn handle_call(&self, payload: Bytes) -> BoxFuture<'static, Bytes> {
        let registry = Arc::clone(&self.registry);
        let service = self.service_name.clone();
        let capacity = self.initial_string_capacity;

        Box::pin(async move {
            property::dispatch::handle_call(&registry, service.as_deref(), capacity, payload).await
        })
    }

    fn handle_signal(&self, signal: Arc<Signal>) -> BoxFuture<'static, ()> {
        let events = Arc::clone(&self.events);
        let service = self.service_name.clone();

        Box::pin(async move {
            event::deliver(&events, service.as_deref(), &signal).await;
        })
    }
}
