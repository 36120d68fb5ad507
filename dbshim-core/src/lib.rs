//! Compatibility shim running legacy database-adapter code on a modern
//! connection/statement driver.
//!
//! This crate translates the synchronous, string-SQL, multi-fetch-mode API
//! of a legacy adapter onto the [`Connection`] and [`DriverStatement`]
//! traits, and rebuilds structured column metadata from textual `DESCRIBE`
//! output.
//!
//! # Architecture
//! - [`adapter::Adapter`] implements the [`LegacyAdapter`] contract over a
//!   shared connection
//! - [`statement::Statement`] wraps one driver statement handle and exposes
//!   legacy binding and fetch styles
//! - [`adapter::describe`] parses column type text into [`ColumnDescriptor`]s
//! - [`drivers::mysql`] implements the driver traits on sqlx (`mysql` feature)

pub mod adapter;
pub mod connection;
#[cfg(feature = "mysql")]
pub mod drivers;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod statement;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use adapter::{Adapter, AdapterConfig, LegacyAdapter, ParameterStyle};
pub use connection::{Connection, DriverStatement, ErrorInfo, Platform, ResultSet, ServerAttribute};
pub use error::{DriverError, DriverResult, Result, ShimError};
pub use fetch::{CursorOrientation, FetchMode, Row};
pub use logging::init_logging;
pub use models::{CaseFolding, ColumnDescriptor, ParamKey, ParamType, Params, Value};
pub use statement::{QueryBuilder, QuerySource, Statement, StatementState};
