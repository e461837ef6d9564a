//! Serving inbound property calls.

use bytes::Bytes;
use prost::Message;
use tracing::{debug, warn};

use super::{Accessors, PropError, PropertyDescriptor, PropertyRegistry, PROPERTIES_LISTING};
use crate::error::{LipcError, Result, StatusCode};
use crate::hasharray::HashArray;
use crate::proto::{property_value, Access, PropertyKind, PropertyRequest, PropertyResponse, PropertyValue};

/// Decode a call, run it against the registry and encode the reply.
pub(crate) async fn handle_call(
    registry: &PropertyRegistry,
    service: Option<&str>,
    initial_capacity: usize,
    payload: Bytes,
) -> Bytes {
    let response = match PropertyRequest::decode(payload) {
        Ok(request) => match dispatch(registry, service, initial_capacity, &request).await {
            Ok(value) => PropertyResponse {
                code: StatusCode::Ok.code(),
                message: String::new(),
                value,
            },
            Err(e) => {
                debug!(property = %request.property, error = %e, "Property call failed");
                error_response(&e)
            }
        },
        Err(e) => {
            warn!(error = %e, "Malformed property call");
            error_response(&LipcError::from(e))
        }
    };

    Bytes::from(response.encode_to_vec())
}

fn error_response(err: &LipcError) -> PropertyResponse {
    PropertyResponse {
        code: err.status().code(),
        message: err.detail().to_string(),
        value: None,
    }
}

/// Run one request.
pub(crate) async fn dispatch(
    registry: &PropertyRegistry,
    service: Option<&str>,
    initial_capacity: usize,
    request: &PropertyRequest,
) -> Result<Option<PropertyValue>> {
    let name = request.property.as_str();
    let kind = PropertyKind::try_from(request.kind)
        .map_err(|_| LipcError::InvalidArg(format!("unknown property kind {}", request.kind)))?;
    let access = Access::try_from(request.access)
        .map_err(|_| LipcError::InvalidArg(format!("unknown access {}", request.access)))?;

    if name == PROPERTIES_LISTING {
        return match (kind, access) {
            (PropertyKind::String, Access::Get) => {
                Ok(Some(PropertyValue::string(registry.listing().await)))
            }
            (PropertyKind::String, Access::Set) => Err(LipcError::AccessNotAllowed(name.to_string())),
            _ => Err(LipcError::InvalidArg(format!("'{name}' is a string property"))),
        };
    }

    // Clone the descriptor out so callbacks run without the registry lock
    let descriptor = registry
        .lookup(name)
        .await
        .ok_or_else(|| LipcError::NoSuchProperty(name.to_string()))?;

    if descriptor.kind() != kind {
        return Err(LipcError::InvalidArg(format!(
            "property '{name}' is {:?}, not {kind:?}",
            descriptor.kind()
        )));
    }

    // Callbacks are plain closures and may block; keep them off the runtime
    // so the caller's timeout can still elapse.
    let service = service.map(str::to_string);
    let value = request.value.clone();
    tokio::task::spawn_blocking(move || {
        let service = service.as_deref();
        match access {
            Access::Get => get(&descriptor, service, initial_capacity, value.as_ref()),
            Access::Set => set(&descriptor, service, value.as_ref()),
        }
    })
    .await
    .map_err(|e| LipcError::Internal(format!("property '{name}' callback aborted: {e}")))?
}

fn get(
    descriptor: &PropertyDescriptor,
    service: Option<&str>,
    initial_capacity: usize,
    input: Option<&PropertyValue>,
) -> Result<Option<PropertyValue>> {
    let denied = || LipcError::AccessNotAllowed(descriptor.name.clone());

    match &descriptor.accessors {
        Accessors::Int { getter, .. } => {
            let getter = getter.as_ref().ok_or_else(denied)?;
            let value = getter(&descriptor.call(service, std::mem::size_of::<i32>()))
                .map_err(|e| callback_error(&descriptor.name, e))?;
            Ok(Some(PropertyValue::int(value)))
        }
        Accessors::String { getter, .. } => {
            let getter = getter.as_ref().ok_or_else(denied)?;
            let value = match getter(&descriptor.call(service, initial_capacity)) {
                Err(PropError::BufferTooSmall { needed }) => {
                    debug!(property = %descriptor.name, needed, "Growing string buffer");
                    getter(&descriptor.call(service, needed))
                }
                other => other,
            }
            .map_err(|e| callback_error(&descriptor.name, e))?;
            Ok(Some(PropertyValue::string(value)))
        }
        Accessors::Hasharray { getter, .. } => {
            let getter = getter.as_ref().ok_or_else(denied)?;
            let input = decode_hasharray(input)?;
            access_hasharray(descriptor, getter, service, input.as_ref())
        }
    }
}

fn set(
    descriptor: &PropertyDescriptor,
    service: Option<&str>,
    value: Option<&PropertyValue>,
) -> Result<Option<PropertyValue>> {
    let denied = || LipcError::AccessNotAllowed(descriptor.name.clone());
    let call = descriptor.call(service, 0);

    match (&descriptor.accessors, value.and_then(|v| v.value.as_ref())) {
        (Accessors::Int { setter, .. }, Some(property_value::Value::Int(value))) => {
            let setter = setter.as_ref().ok_or_else(denied)?;
            setter(&call, *value).map_err(|e| callback_error(&descriptor.name, e))?;
            Ok(None)
        }
        (Accessors::String { setter, .. }, Some(property_value::Value::Str(value))) => {
            let setter = setter.as_ref().ok_or_else(denied)?;
            setter(&call, value.as_str()).map_err(|e| callback_error(&descriptor.name, e))?;
            Ok(None)
        }
        (Accessors::Hasharray { setter, .. }, _) => {
            let setter = setter.as_ref().ok_or_else(denied)?;
            let input = decode_hasharray(value)?;
            access_hasharray(descriptor, setter, service, input.as_ref())
        }
        _ => Err(LipcError::InvalidArg(format!(
            "missing or mistyped value for '{}'",
            descriptor.name
        ))),
    }
}

fn access_hasharray(
    descriptor: &PropertyDescriptor,
    callback: &super::HashArrayCallback,
    service: Option<&str>,
    input: Option<&HashArray>,
) -> Result<Option<PropertyValue>> {
    let output = callback(&descriptor.call(service, 0), input)
        .map_err(|e| callback_error(&descriptor.name, e))?;
    Ok(output.map(|ha| PropertyValue::hasharray(ha.to_bytes())))
}

fn decode_hasharray(value: Option<&PropertyValue>) -> Result<Option<HashArray>> {
    match value.and_then(|v| v.value.as_ref()) {
        None => Ok(None),
        Some(property_value::Value::Hasharray(bytes)) => HashArray::from_bytes(bytes).map(Some),
        Some(_) => Err(LipcError::InvalidArg("expected a hash-array value".to_string())),
    }
}

/// Map a callback failure to the status reported to the caller.
///
/// Callback-internal states never reach the caller as such. Neither does
/// `BufferTooSmall`, which only drives the string growth handshake.
fn callback_error(property: &str, err: PropError) -> LipcError {
    match err {
        PropError::Status(status)
            if !status.is_callback_internal() && status != StatusCode::BufferTooSmall =>
        {
            LipcError::from_status(status, property).unwrap_or_else(|| {
                LipcError::Internal(format!("property '{property}' callback reported success as an error"))
            })
        }
        other => {
            warn!(property = %property, error = %other, "Property callback failed");
            LipcError::Internal(format!("property '{property}': {other}"))
        }
    }
}
