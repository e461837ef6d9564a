//! openlipc - property and event broker client
//!
//! A service opens a [`Connection`] to a shared message bus, optionally under
//! a well-known name, exposes typed properties through getter and setter
//! callbacks, reads and writes the properties of other services, and sends
//! and receives named events with ordered typed parameters. [`HashArray`]
//! carries structured property values.
//!
//! The transport is abstracted behind [`bus::Bus`]; [`bus::LocalBus`] routes
//! between connections of the same process.

pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod hasharray;
pub mod property;
pub mod proto;
pub mod utils;

pub use connection::Connection;
pub use error::{error_string, LipcError, Result, StatusCode};
pub use event::{event_callback, Event, EventCallback, EventContext, EventParam};
pub use hasharray::{HashArray, HashValue, HashValueType};
pub use property::{
    hasharray_callback, int_getter, int_setter, string_getter, string_setter, PropError,
    PropertyCall, UserData,
};
