//! Event subscriptions of a connection.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::Event;
use crate::bus::SignalFilter;
use crate::connection::Connection;
use crate::error::{LipcError, Result};
use crate::property::UserData;

/// Event handler.
pub type EventCallback = Arc<dyn Fn(&EventContext<'_>, &mut Event) -> Result<()> + Send + Sync>;

pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(&EventContext<'_>, &mut Event) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a callback knows about the delivery.
pub struct EventContext<'a> {
    service_name: Option<&'a str>,
    name: &'a str,
    data: Option<&'a UserData>,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(service_name: Option<&'a str>, name: &'a str, data: Option<&'a UserData>) -> Self {
        Self {
            service_name,
            name,
            data,
        }
    }

    /// Service name of the receiving connection.
    pub fn service_name(&self) -> Option<&'a str> {
        self.service_name
    }

    /// Name of the delivered event.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Data given when subscribing.
    pub fn data(&self) -> Option<&'a UserData> {
        self.data
    }

    pub fn data_as<T: Any>(&self) -> Option<&'a T> {
        self.data.and_then(|data| data.downcast_ref::<T>())
    }
}

enum Handler {
    /// Resolved to the connection's default callback at delivery.
    Default,
    Callback(EventCallback),
}

struct Subscription {
    service: String,
    name: Option<String>,
    handler: Handler,
    data: Option<UserData>,
}

impl Subscription {
    fn matches(&self, source: &str, name: &str) -> bool {
        self.service == source && self.name.as_deref().is_none_or(|n| n == name)
    }

    fn filter(&self) -> SignalFilter {
        SignalFilter::new(self.service.clone(), self.name.as_deref())
    }
}

/// Subscriptions in the order they were added.
pub(crate) struct SubscriptionTable {
    default: RwLock<Option<EventCallback>>,
    subscriptions: RwLock<Vec<Arc<Subscription>>>,
}

impl SubscriptionTable {
    pub(crate) fn new() -> Self {
        Self {
            default: RwLock::new(None),
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    async fn set_default(&self, callback: EventCallback) {
        *self.default.write().await = Some(callback);
    }

    async fn add(&self, subscription: Subscription) {
        self.subscriptions.write().await.push(Arc::new(subscription));
    }

    /// Remove every subscription for exactly `(service, name)`.
    ///
    /// Returns the data of the most recently added one.
    async fn remove(&self, service: &str, name: Option<&str>) -> Result<Option<UserData>> {
        let mut subscriptions = self.subscriptions.write().await;
        let before = subscriptions.len();

        let mut data = None;
        subscriptions.retain(|sub| {
            if sub.service == service && sub.name.as_deref() == name {
                data = sub.data.clone();
                false
            } else {
                true
            }
        });

        if subscriptions.len() == before {
            return Err(LipcError::NoSuchSource(service.to_string()));
        }
        Ok(data)
    }

    /// Callbacks to run for an event, in subscription order.
    pub(crate) async fn matching(
        &self,
        source: &str,
        name: &str,
    ) -> Vec<(EventCallback, Option<UserData>)> {
        let default = self.default.read().await.clone();
        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|sub| sub.matches(source, name))
            .filter_map(|sub| {
                let callback = match &sub.handler {
                    Handler::Callback(callback) => Arc::clone(callback),
                    Handler::Default => default.clone()?,
                };
                Some((callback, sub.data.clone()))
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub(crate) async fn clear(&self) {
        self.subscriptions.write().await.clear();
        *self.default.write().await = None;
    }
}

impl Connection {
    /// Install the default event callback, replacing any previous one.
    pub async fn set_event_callback(&self, callback: EventCallback) {
        self.events().set_default(callback).await;
    }

    /// Receive every event of `service` through the default callback.
    pub async fn subscribe(&self, service: &str) -> Result<()> {
        self.add_subscription(service, None, Handler::Default, None)
            .await
    }

    /// Receive events of `service`, all of them or only those called `name`.
    ///
    /// Subscriptions are additive: each matching one fires.
    pub async fn subscribe_ext(
        &self,
        service: &str,
        name: Option<&str>,
        callback: EventCallback,
        data: Option<UserData>,
    ) -> Result<()> {
        self.add_subscription(service, name, Handler::Callback(callback), data)
            .await
    }

    /// Drop the subscriptions for `(service, name)`.
    ///
    /// Returns the data of the most recently added one.
    pub async fn unsubscribe_ext(&self, service: &str, name: Option<&str>) -> Result<Option<UserData>> {
        let data = self.events().remove(service, name).await?;

        // No subscription for this exact filter is left. The table is already
        // updated, so a stale bus filter only costs unmatched deliveries.
        let filter = SignalFilter::new(service, name);
        if let Err(e) = self.bus.unsubscribe(self.session, &filter).await {
            warn!(service = %service, event = ?name, error = %e, "Failed to remove bus filter");
        }

        info!(service = %service, event = ?name, "Unsubscribed");
        Ok(data)
    }

    async fn add_subscription(
        &self,
        service: &str,
        name: Option<&str>,
        handler: Handler,
        data: Option<UserData>,
    ) -> Result<()> {
        if service.is_empty() {
            return Err(LipcError::InvalidArg("empty service name".to_string()));
        }

        let subscription = Subscription {
            service: service.to_string(),
            name: name.map(str::to_string),
            handler,
            data,
        };

        self.bus
            .subscribe(self.session, subscription.filter())
            .await
            .map_err(|e| LipcError::SubscriptionFailed(e.to_string()))?;
        self.events().add(subscription).await;

        debug!(service = %service, event = ?name, "Subscribed");
        Ok(())
    }
}
