//! Reading and writing properties of other services.

use bytes::Bytes;
use prost::Message;
use tracing::debug;

use super::PROPERTIES_LISTING;
use crate::connection::Connection;
use crate::error::{LipcError, Result, StatusCode};
use crate::hasharray::HashArray;
use crate::proto::{property_value, Access, PropertyKind, PropertyRequest, PropertyResponse, PropertyValue};

impl Connection {
    /// Read an integer property.
    pub async fn get_int_property(&self, service: &str, property: &str) -> Result<i32> {
        let value = self
            .property_call(service, property, PropertyKind::Int, Access::Get, None)
            .await?;
        match value {
            Some(property_value::Value::Int(value)) => Ok(value),
            other => Err(unexpected_reply(property, other)),
        }
    }

    /// Write an integer property.
    pub async fn set_int_property(&self, service: &str, property: &str, value: i32) -> Result<()> {
        self.property_call(
            service,
            property,
            PropertyKind::Int,
            Access::Set,
            Some(PropertyValue::int(value)),
        )
        .await?;
        Ok(())
    }

    /// Read a string property.
    pub async fn get_string_property(&self, service: &str, property: &str) -> Result<String> {
        let value = self
            .property_call(service, property, PropertyKind::String, Access::Get, None)
            .await?;
        match value {
            Some(property_value::Value::Str(value)) => Ok(value),
            other => Err(unexpected_reply(property, other)),
        }
    }

    /// Write a string property.
    pub async fn set_string_property(&self, service: &str, property: &str, value: &str) -> Result<()> {
        self.property_call(
            service,
            property,
            PropertyKind::String,
            Access::Set,
            Some(PropertyValue::string(value)),
        )
        .await?;
        Ok(())
    }

    /// Read a hash-array property.
    pub async fn get_hasharray_property(
        &self,
        service: &str,
        property: &str,
    ) -> Result<Option<HashArray>> {
        let value = self
            .property_call(service, property, PropertyKind::Hasharray, Access::Get, None)
            .await?;
        self.hasharray_reply(property, value)
    }

    /// Pass a hash-array to a property and collect its output.
    ///
    /// With an input this is a write and needs the remote setter; without one
    /// it is a read.
    pub async fn access_hasharray_property(
        &self,
        service: &str,
        property: &str,
        input: Option<&HashArray>,
    ) -> Result<Option<HashArray>> {
        let (access, value) = match input {
            Some(ha) => (Access::Set, Some(PropertyValue::hasharray(ha.to_bytes()))),
            None => (Access::Get, None),
        };
        let value = self
            .property_call(service, property, PropertyKind::Hasharray, access, value)
            .await?;
        self.hasharray_reply(property, value)
    }

    /// List the properties of a service.
    ///
    /// Each property is rendered as `"<name> <type> <mode> "`, most recently
    /// registered first.
    pub async fn get_properties(&self, service: &str) -> Result<String> {
        self.get_string_property(service, PROPERTIES_LISTING).await
    }

    #[tracing::instrument(
        name = "lipc.property_call",
        skip_all,
        fields(service = %service, property = %property, kind = ?kind, access = ?access)
    )]
    async fn property_call(
        &self,
        service: &str,
        property: &str,
        kind: PropertyKind,
        access: Access,
        value: Option<PropertyValue>,
    ) -> Result<Option<property_value::Value>> {
        let request = PropertyRequest {
            property: property.to_string(),
            kind: kind as i32,
            access: access as i32,
            value,
        };

        let reply = self
            .bus
            .call(
                self.session,
                service,
                Bytes::from(request.encode_to_vec()),
                self.timeout,
            )
            .await?;

        let response = PropertyResponse::decode(reply)?;
        let status = StatusCode::from_code(response.code);
        if let Some(err) = LipcError::from_status(status, response.message) {
            debug!(%status, "Remote property call failed");
            return Err(err);
        }

        Ok(response.value.and_then(|v| v.value))
    }

    fn hasharray_reply(
        &self,
        property: &str,
        value: Option<property_value::Value>,
    ) -> Result<Option<HashArray>> {
        match value {
            None => Ok(None),
            Some(property_value::Value::Hasharray(bytes)) => {
                let mut ha = HashArray::from_bytes(&bytes)?;
                ha.set_owner(Some(self.session));
                Ok(Some(ha))
            }
            other => Err(unexpected_reply(property, other)),
        }
    }
}

fn unexpected_reply(property: &str, value: Option<property_value::Value>) -> LipcError {
    LipcError::Internal(format!(
        "unexpected reply for property '{property}': {value:?}"
    ))
}
