//! Typed properties served to other services.
//!
//! A property is a named value exposed through getter and setter callbacks.
//! The access mode follows from which callbacks are present: readable with a
//! getter, writable with a setter.
//!
//! Remote callers reach properties through [`dispatch`]; the calling side
//! lives in [`client`].

pub mod client;
pub(crate) mod dispatch;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::connection::Connection;
use crate::error::{LipcError, Result, StatusCode};
use crate::hasharray::HashArray;
use crate::proto::PropertyKind;

/// Name of the read-only pseudo-property listing all properties.
pub const PROPERTIES_LISTING: &str = "_properties";

/// Opaque caller data stored with a property or subscription.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Failure reported by a property callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropError {
    /// The offered capacity is too small; retry with `needed` bytes.
    #[error("buffer too small, {needed} bytes needed")]
    BufferTooSmall { needed: usize },

    #[error("callback in invalid state")]
    InvalidState,

    #[error("value not initialized")]
    NotInitialized,

    #[error("callback failed")]
    Internal,

    /// Any other status to report to the caller.
    #[error("{0}")]
    Status(StatusCode),
}

impl PropError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BufferTooSmall { .. } => StatusCode::BufferTooSmall,
            Self::InvalidState => StatusCode::PropInvalidState,
            Self::NotInitialized => StatusCode::PropNotInitialized,
            Self::Internal => StatusCode::PropInternal,
            Self::Status(status) => *status,
        }
    }
}

/// Context handed to property callbacks.
pub struct PropertyCall<'a> {
    name: &'a str,
    service: Option<&'a str>,
    data: Option<&'a UserData>,
    capacity: usize,
}

impl<'a> PropertyCall<'a> {
    /// Property being accessed.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Service name of the connection serving the property.
    pub fn service(&self) -> Option<&'a str> {
        self.service
    }

    /// Data given at registration.
    pub fn data(&self) -> Option<&'a UserData> {
        self.data
    }

    /// Data given at registration, if it has type `T`.
    pub fn data_as<T: Any>(&self) -> Option<&'a T> {
        self.data.and_then(|data| data.downcast_ref::<T>())
    }

    /// Byte capacity offered to a string getter.
    ///
    /// A getter whose value does not fit returns
    /// [`PropError::BufferTooSmall`] and is called once more with the
    /// capacity it asked for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

pub type IntGetter = Arc<dyn Fn(&PropertyCall<'_>) -> std::result::Result<i32, PropError> + Send + Sync>;
pub type IntSetter =
    Arc<dyn Fn(&PropertyCall<'_>, i32) -> std::result::Result<(), PropError> + Send + Sync>;
pub type StringGetter =
    Arc<dyn Fn(&PropertyCall<'_>) -> std::result::Result<String, PropError> + Send + Sync>;
pub type StringSetter =
    Arc<dyn Fn(&PropertyCall<'_>, &str) -> std::result::Result<(), PropError> + Send + Sync>;

/// Combined hash-array accessor.
///
/// Receives the caller's input hash-array, if any, and returns the output
/// hash-array, if any.
pub type HashArrayCallback = Arc<
    dyn Fn(&PropertyCall<'_>, Option<&HashArray>) -> std::result::Result<Option<HashArray>, PropError>
        + Send
        + Sync,
>;

pub fn int_getter<F>(f: F) -> IntGetter
where
    F: Fn(&PropertyCall<'_>) -> std::result::Result<i32, PropError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn int_setter<F>(f: F) -> IntSetter
where
    F: Fn(&PropertyCall<'_>, i32) -> std::result::Result<(), PropError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn string_getter<F>(f: F) -> StringGetter
where
    F: Fn(&PropertyCall<'_>) -> std::result::Result<String, PropError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn string_setter<F>(f: F) -> StringSetter
where
    F: Fn(&PropertyCall<'_>, &str) -> std::result::Result<(), PropError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn hasharray_callback<F>(f: F) -> HashArrayCallback
where
    F: Fn(&PropertyCall<'_>, Option<&HashArray>) -> std::result::Result<Option<HashArray>, PropError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

pub(crate) enum Accessors {
    Int {
        getter: Option<IntGetter>,
        setter: Option<IntSetter>,
    },
    String {
        getter: Option<StringGetter>,
        setter: Option<StringSetter>,
    },
    Hasharray {
        getter: Option<HashArrayCallback>,
        setter: Option<HashArrayCallback>,
    },
}

/// One registered property.
pub(crate) struct PropertyDescriptor {
    pub(crate) name: String,
    pub(crate) accessors: Accessors,
    pub(crate) data: Option<UserData>,
}

impl PropertyDescriptor {
    pub(crate) fn kind(&self) -> PropertyKind {
        match self.accessors {
            Accessors::Int { .. } => PropertyKind::Int,
            Accessors::String { .. } => PropertyKind::String,
            Accessors::Hasharray { .. } => PropertyKind::Hasharray,
        }
    }

    pub(crate) fn readable(&self) -> bool {
        match &self.accessors {
            Accessors::Int { getter, .. } => getter.is_some(),
            Accessors::String { getter, .. } => getter.is_some(),
            Accessors::Hasharray { getter, .. } => getter.is_some(),
        }
    }

    pub(crate) fn writable(&self) -> bool {
        match &self.accessors {
            Accessors::Int { setter, .. } => setter.is_some(),
            Accessors::String { setter, .. } => setter.is_some(),
            Accessors::Hasharray { setter, .. } => setter.is_some(),
        }
    }

    pub(crate) fn mode(&self) -> &'static str {
        match (self.readable(), self.writable()) {
            (true, true) => "rw",
            (true, false) => "r",
            (false, true) => "w",
            (false, false) => "",
        }
    }

    pub(crate) fn call<'a>(&'a self, service: Option<&'a str>, capacity: usize) -> PropertyCall<'a> {
        PropertyCall {
            name: &self.name,
            service,
            data: self.data.as_ref(),
            capacity,
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("mode", &self.mode())
            .finish()
    }
}

/// Label used for a kind in the property listing.
pub(crate) fn kind_label(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::Int => "Int",
        PropertyKind::String => "Str",
        PropertyKind::Hasharray => "Hasharray",
    }
}

/// Properties of one connection, most recently registered first.
pub(crate) struct PropertyRegistry {
    entries: RwLock<Vec<Arc<PropertyDescriptor>>>,
}

impl PropertyRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Add a property, replacing any previous one with the same name.
    pub(crate) async fn register(&self, descriptor: PropertyDescriptor) -> Result<()> {
        if descriptor.name.is_empty() {
            return Err(LipcError::InvalidArg("empty property name".to_string()));
        }
        if descriptor.name == PROPERTIES_LISTING {
            return Err(LipcError::OperationNotAllowed(format!(
                "'{PROPERTIES_LISTING}' is reserved"
            )));
        }

        let mut entries = self.entries.write().await;
        entries.retain(|entry| entry.name != descriptor.name);
        entries.insert(0, Arc::new(descriptor));
        Ok(())
    }

    /// Remove a property and hand back its data.
    pub(crate) async fn unregister(&self, name: &str) -> Result<Option<UserData>> {
        let mut entries = self.entries.write().await;
        let position = entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| LipcError::NoSuchProperty(name.to_string()))?;

        let removed = entries.remove(position);
        Ok(removed.data.clone())
    }

    pub(crate) async fn lookup(&self, name: &str) -> Option<Arc<PropertyDescriptor>> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.name == name)
            .cloned()
    }

    /// Render the `_properties` listing.
    pub(crate) async fn listing(&self) -> String {
        self.entries
            .read()
            .await
            .iter()
            .map(|entry| format!("{} {} {} ", entry.name, kind_label(entry.kind()), entry.mode()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub(crate) async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

// ============================================================================
// Registration
// ============================================================================

impl Connection {
    /// Register an integer property.
    ///
    /// A property registered under an existing name replaces it.
    pub async fn register_int_property(
        &self,
        name: &str,
        getter: Option<IntGetter>,
        setter: Option<IntSetter>,
        data: Option<UserData>,
    ) -> Result<()> {
        self.register_property(name, Accessors::Int { getter, setter }, data)
            .await
    }

    /// Register a string property.
    pub async fn register_string_property(
        &self,
        name: &str,
        getter: Option<StringGetter>,
        setter: Option<StringSetter>,
        data: Option<UserData>,
    ) -> Result<()> {
        self.register_property(name, Accessors::String { getter, setter }, data)
            .await
    }

    /// Register a hash-array property.
    pub async fn register_hasharray_property(
        &self,
        name: &str,
        getter: Option<HashArrayCallback>,
        setter: Option<HashArrayCallback>,
        data: Option<UserData>,
    ) -> Result<()> {
        self.register_property(name, Accessors::Hasharray { getter, setter }, data)
            .await
    }

    /// Remove a property, returning the data it was registered with.
    pub async fn unregister_property(&self, name: &str) -> Result<Option<UserData>> {
        let data = self.registry().unregister(name).await?;
        info!(property = %name, "Property unregistered");
        Ok(data)
    }

    async fn register_property(
        &self,
        name: &str,
        accessors: Accessors,
        data: Option<UserData>,
    ) -> Result<()> {
        let descriptor = PropertyDescriptor {
            name: name.to_string(),
            accessors,
            data,
        };
        let kind = descriptor.kind();
        let mode = descriptor.mode();

        self.registry().register(descriptor).await?;

        info!(property = %name, ?kind, mode, "Property registered");
        Ok(())
    }
}
