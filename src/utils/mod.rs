//! Logging support.

pub mod bootstrap;
pub mod logging;
