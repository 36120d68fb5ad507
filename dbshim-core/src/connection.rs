//! Capability set the shims require from a modern database driver.
//!
//! The shims never talk to a database directly. They are written against
//! [`Connection`] and [`DriverStatement`], which any connection/statement
//! oriented client can implement. The `mysql` feature ships one such
//! implementation in [`crate::drivers::mysql`].
//!
//! # Object Safety
//! Both traits are object-safe; the adapter holds an `Arc<dyn Connection>`
//! and every statement shim owns a `Box<dyn DriverStatement>`.

use crate::error::DriverResult;
use crate::fetch::{FetchMode, Row};
use crate::models::{ParamKey, ParamType, Params, Value};

/// Dialect descriptor exposed by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Display name of the dialect
    pub name: &'static str,
    /// Character used to quote identifiers
    pub identifier_quote: char,
}

/// Attributes that can be read from the native handle behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAttribute {
    /// Raw server version string, e.g. `8.0.36-log`
    ServerVersion,
}

/// Fully buffered result of an ad-hoc query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in select-list order
    pub columns: Vec<String>,
    /// Positional cells of each row
    pub rows: Vec<Vec<Value>>,
    /// Rows changed by a DML statement
    pub affected_rows: u64,
}

/// `errorInfo` triple reported by a statement handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// `00000` when the last operation succeeded
    pub sqlstate: String,
    /// Driver-specific error number
    pub code: Option<i64>,
    /// Driver error message
    pub message: Option<String>,
}

impl Default for ErrorInfo {
    fn default() -> Self {
        Self {
            sqlstate: "00000".to_string(),
            code: None,
            message: None,
        }
    }
}

impl From<&crate::error::DriverError> for ErrorInfo {
    fn from(error: &crate::error::DriverError) -> Self {
        Self {
            sqlstate: error.sqlstate.clone(),
            code: error.code,
            message: Some(error.message.clone()),
        }
    }
}

/// A modern database connection.
///
/// Implementations use interior mutability: the handle is shared by
/// reference between adapters and all methods take `&self`.
pub trait Connection: Send + Sync {
    /// Opens the underlying connection.
    fn connect(&self) -> DriverResult<()>;

    /// Whether the underlying connection is open.
    fn is_connected(&self) -> bool;

    /// Closes the underlying connection. Closing twice is harmless.
    fn close(&self);

    /// Quotes a string literal using the connection's own escaping rules.
    fn quote(&self, value: &str) -> String;

    /// Prepares a statement handle for `sql`.
    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn DriverStatement>>;

    /// Starts a transaction.
    fn begin_transaction(&self) -> DriverResult<()>;

    /// Commits the active transaction.
    fn commit(&self) -> DriverResult<()>;

    /// Rolls back the active transaction.
    fn roll_back(&self) -> DriverResult<()>;

    /// Identity generated by the most recent insert on this connection.
    fn last_insert_id(&self) -> DriverResult<String>;

    /// Reads an attribute from the wrapped native handle.
    fn server_attribute(&self, attribute: ServerAttribute) -> DriverResult<Option<String>>;

    /// Dialect descriptor.
    fn platform(&self) -> Platform;

    /// Runs `sql` once and buffers every row in positional form.
    fn execute(&self, sql: &str, params: &[(ParamKey, Value)]) -> DriverResult<ResultSet>;
}

/// A prepared statement handle owned by exactly one statement shim.
pub trait DriverStatement: Send + std::fmt::Debug {
    /// Executes the statement, merging `params` over previously bound
    /// values. Returns the driver's success flag.
    fn execute(&mut self, params: Option<&Params>) -> DriverResult<bool>;

    /// Next row of the open cursor as positional cells, or `None` once the
    /// cursor is exhausted or was never opened.
    fn next_values(&mut self) -> DriverResult<Option<Vec<Value>>>;

    /// Result column names in select-list order.
    fn column_names(&self) -> &[String];

    /// Next row in the requested shape.
    fn fetch(&mut self, mode: FetchMode) -> DriverResult<Option<Row>> {
        Ok(self
            .next_values()?
            .map(|values| mode.shape(self.column_names(), values)))
    }

    /// Binds a parameter. `length` is advisory.
    fn bind_param(
        &mut self,
        key: &ParamKey,
        value: Value,
        param_type: ParamType,
        length: Option<usize>,
    ) -> DriverResult<()>;

    /// Binds a value.
    fn bind_value(&mut self, key: &ParamKey, value: Value, param_type: ParamType) -> DriverResult<()> {
        self.bind_param(key, value, param_type, None)
    }

    /// Rows affected by the last execution.
    fn row_count(&self) -> u64;

    /// Number of columns in the result set.
    fn column_count(&self) -> usize {
        self.column_names().len()
    }

    /// Discards any unread rows so the statement can be executed again.
    fn close_cursor(&mut self) -> DriverResult<bool>;

    /// SQLSTATE of the last operation, if one ran.
    fn error_code(&self) -> Option<String>;

    /// Full error triple of the last operation.
    fn error_info(&self) -> ErrorInfo;
}
