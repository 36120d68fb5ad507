//! Concrete implementations of the driver traits.
//!
//! Each driver is feature-gated so the shim itself builds without any
//! database client.

#[cfg(feature = "mysql")]
pub mod mysql;
