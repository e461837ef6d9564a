//! Named events with ordered typed parameters.
//!
//! Events are published by a named service and delivered to every
//! connection subscribed to that service. Parameters are read back in order
//! through a cursor that can be rewound.

mod subscription;

pub use subscription::{event_callback, EventCallback, EventContext};
pub(crate) use subscription::SubscriptionTable;

use bytes::Bytes;
use prost::Message;
use tracing::{debug, warn};

use crate::bus::Signal;
use crate::connection::Connection;
use crate::error::{LipcError, Result};
use crate::proto::{event_param_frame, EventFrame, EventParamFrame};

/// One event parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventParam {
    Int(i32),
    String(String),
}

impl From<i32> for EventParam {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for EventParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EventParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// An event being built for sending, or a received copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: String,
    source: String,
    params: Vec<EventParam>,
    cursor: usize,
}

impl Event {
    pub(crate) fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            params: Vec::new(),
            cursor: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service name of the sender.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn params(&self) -> &[EventParam] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn add_int_param(&mut self, value: i32) {
        self.params.push(EventParam::Int(value));
    }

    pub fn add_string_param(&mut self, value: &str) {
        self.params.push(EventParam::String(value.to_string()));
    }

    /// Read the integer at the cursor and advance.
    ///
    /// Fails with [`LipcError::NoSuchParam`] when the parameters are exhausted
    /// or the next one is not an integer; the cursor does not move then.
    pub fn get_int_param(&mut self) -> Result<i32> {
        match self.params.get(self.cursor) {
            Some(EventParam::Int(value)) => {
                self.cursor += 1;
                Ok(*value)
            }
            _ => Err(LipcError::NoSuchParam),
        }
    }

    /// Read the string at the cursor and advance.
    pub fn get_string_param(&mut self) -> Result<&str> {
        match self.params.get(self.cursor) {
            Some(EventParam::String(value)) => {
                self.cursor += 1;
                Ok(value)
            }
            _ => Err(LipcError::NoSuchParam),
        }
    }

    /// Move the cursor back to the first parameter.
    pub fn rewind_params(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn to_frame(&self) -> EventFrame {
        EventFrame {
            name: self.name.clone(),
            source: self.source.clone(),
            params: self
                .params
                .iter()
                .map(|param| EventParamFrame {
                    value: Some(match param {
                        EventParam::Int(v) => event_param_frame::Value::Int(*v),
                        EventParam::String(v) => event_param_frame::Value::Str(v.clone()),
                    }),
                })
                .collect(),
        }
    }

    pub(crate) fn from_frame(frame: EventFrame) -> Result<Self> {
        let params = frame
            .params
            .into_iter()
            .map(|param| match param.value {
                Some(event_param_frame::Value::Int(v)) => Ok(EventParam::Int(v)),
                Some(event_param_frame::Value::Str(v)) => Ok(EventParam::String(v)),
                None => Err(LipcError::Internal("event parameter without value".to_string())),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: frame.name,
            source: frame.source,
            params,
            cursor: 0,
        })
    }
}

// ============================================================================
// Sending
// ============================================================================

impl Connection {
    /// Start a new event originating from this connection.
    pub fn new_event(&self, name: &str) -> Result<Event> {
        let source = self.service_name().ok_or_else(|| {
            LipcError::OperationNotAllowed("anonymous connections cannot send events".to_string())
        })?;
        if name.is_empty() {
            return Err(LipcError::InvalidArg("empty event name".to_string()));
        }
        Ok(Event::new(name, source))
    }

    /// Publish an event.
    ///
    /// Returns once every local subscriber has handled it. There is no
    /// acknowledgement from remote subscribers.
    #[tracing::instrument(name = "lipc.send_event", skip_all, fields(event = %event.name()))]
    pub async fn send_event(&self, event: &Event) -> Result<()> {
        let sender = self.service_name().ok_or_else(|| {
            LipcError::OperationNotAllowed("anonymous connections cannot send events".to_string())
        })?;

        let frame = event.to_frame();
        let size = frame.encoded_len();
        if size > self.limits.max_message_bytes {
            return Err(LipcError::ParamsSizeExceeded {
                size,
                limit: self.limits.max_message_bytes,
            });
        }

        let signal = Signal {
            sender: sender.to_string(),
            member: event.name().to_string(),
            payload: Bytes::from(frame.encode_to_vec()),
        };
        self.bus.publish(self.session, signal).await?;

        debug!(params = event.param_count(), "Event sent");
        Ok(())
    }

    /// Build and publish an event in one step.
    ///
    /// ```ignore
    /// lipc.create_and_send_event("event", [EventParam::from(0xDEAD), "OK".into()]).await?;
    /// ```
    pub async fn create_and_send_event<I, P>(&self, name: &str, params: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<EventParam>,
    {
        let mut event = self.new_event(name)?;
        event.params.extend(params.into_iter().map(Into::into));
        self.send_event(&event).await
    }
}

// ============================================================================
// Receiving
// ============================================================================

/// Hand an inbound signal to the matching subscriptions.
pub(crate) async fn deliver(events: &SubscriptionTable, service: Option<&str>, signal: &Signal) {
    let event = match EventFrame::decode(signal.payload.clone())
        .map_err(LipcError::from)
        .and_then(Event::from_frame)
    {
        Ok(event) => event,
        Err(e) => {
            warn!(sender = %signal.sender, member = %signal.member, error = %e, "Dropping malformed event");
            return;
        }
    };

    let handlers = events.matching(event.source(), event.name()).await;
    debug!(
        source = %event.source(),
        event = %event.name(),
        handlers = handlers.len(),
        "Event received"
    );

    for (callback, data) in handlers {
        let context = EventContext::new(service, event.name(), data.as_ref());
        let mut copy = event.clone();
        if let Err(e) = callback(&context, &mut copy) {
            warn!(event = %event.name(), error = %e, "Event callback failed");
        }
    }
}
