//! Wire messages exchanged over the bus.
//!
//! Declared by hand with the prost derives; the schema is small and owned by
//! this crate, so there is no `.proto` build step.

/// Value kind of a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PropertyKind {
    Int = 0,
    String = 1,
    Hasharray = 2,
}

/// Direction of a property call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Access {
    Get = 0,
    Set = 1,
}

/// Remote property call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyRequest {
    #[prost(string, tag = "1")]
    pub property: String,
    #[prost(enumeration = "PropertyKind", tag = "2")]
    pub kind: i32,
    #[prost(enumeration = "Access", tag = "3")]
    pub access: i32,
    /// Value to set, or hash-array input of an access.
    #[prost(message, optional, tag = "4")]
    pub value: Option<PropertyValue>,
}

/// Reply to a [`PropertyRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyResponse {
    /// Numeric status, see [`crate::StatusCode`].
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub value: Option<PropertyValue>,
}

/// Typed property value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyValue {
    #[prost(oneof = "property_value::Value", tags = "1, 2, 3")]
    pub value: Option<property_value::Value>,
}

pub mod property_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(int32, tag = "1")]
        Int(i32),
        #[prost(string, tag = "2")]
        Str(String),
        /// Hash-array in its saved binary form.
        #[prost(bytes = "vec", tag = "3")]
        Hasharray(Vec<u8>),
    }
}

/// Published event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventFrame {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub source: String,
    #[prost(message, repeated, tag = "3")]
    pub params: Vec<EventParamFrame>,
}

/// One event parameter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventParamFrame {
    #[prost(oneof = "event_param_frame::Value", tags = "1, 2")]
    pub value: Option<event_param_frame::Value>,
}

pub mod event_param_frame {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(int32, tag = "1")]
        Int(i32),
        #[prost(string, tag = "2")]
        Str(String),
    }
}

impl PropertyValue {
    pub fn int(value: i32) -> Self {
        Self {
            value: Some(property_value::Value::Int(value)),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: Some(property_value::Value::Str(value.into())),
        }
    }

    pub fn hasharray(bytes: Vec<u8>) -> Self {
        Self {
            value: Some(property_value::Value::Hasharray(bytes)),
        }
    }
}
