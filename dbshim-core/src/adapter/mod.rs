//! Legacy adapter contract and its implementation over a modern connection.
//!
//! # Architecture
//! [`Adapter`] wraps one shared [`Connection`]. Operations either delegate
//! straight to the connection (quoting, transactions, connect/close,
//! last-insert-id) or build a [`Statement`] that delegates to a driver
//! statement handle. Table introspection runs `DESCRIBE` and routes each
//! positional row through [`describe::parse_describe_row`].
//!
//! # Example
//! ```rust,no_run
//! # #[cfg(feature = "mysql")]
//! # fn example() -> dbshim_core::Result<()> {
//! use dbshim_core::adapter::{Adapter, AdapterConfig, LegacyAdapter};
//! use dbshim_core::drivers::mysql::MySqlConnection;
//! use std::sync::Arc;
//!
//! let connection = Arc::new(MySqlConnection::new("mysql://app@localhost/shop")?);
//! let adapter = Adapter::new(connection, AdapterConfig::default());
//!
//! let sql = adapter.limit("SELECT * FROM orders", 10, 20)?;
//! for row in adapter.fetch_all(sql.as_str().into(), None)? {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod describe;
pub mod type_mapping;


pub use config::AdapterConfig;
pub use describe::{DescribeRow, ParsedType, parse_describe_row, parse_type};
pub use type_mapping::{NumericClass, NumericTypes, TypeToken};

use crate::Result;
use crate::connection::{Connection, ServerAttribute};
use crate::error::ShimError;
use crate::fetch::{FetchMode, Row};
use crate::models::{ColumnDescriptor, Params, Value};
use crate::statement::{QuerySource, Statement};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Placeholder styles a prepared statement may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    /// `?`
    Positional,
    /// `:name`
    Named,
}

/// The legacy adapter contract.
pub trait LegacyAdapter {
    /// Opens the connection unless it is already open.
    fn connect(&self) -> Result<()>;

    /// Whether the wrapped connection is open.
    fn is_connected(&self) -> bool;

    /// Closes the wrapped connection.
    fn close_connection(&self);

    /// Prepares a statement shim for SQL text or a query builder.
    fn prepare(&self, source: QuerySource<'_>) -> Result<Statement<'_>>;

    /// Quotes a value as a SQL literal.
    fn quote(&self, value: &Value) -> String;

    /// Appends a pagination clause to `sql`.
    fn limit(&self, sql: &str, count: i64, offset: i64) -> Result<String>;

    /// Names of the tables in the current database.
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Column descriptors for `table`, keyed by column name in table order.
    fn describe_table(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<IndexMap<String, ColumnDescriptor>>;

    /// Starts a transaction; fails with `25000` when one is already open.
    fn begin_transaction(&self) -> Result<()>;

    /// Commits the open transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls back the open transaction.
    fn roll_back(&self) -> Result<()>;

    /// Identity generated by the last insert. Both arguments are accepted
    /// for contract compatibility and ignored.
    fn last_insert_id(&self, table: Option<&str>, primary_key: Option<&str>) -> Result<String>;

    /// Dotted server version, or `None` when it cannot be determined.
    fn server_version(&self) -> Option<String>;

    /// Sets the default fetch mode from a legacy code.
    fn set_fetch_mode(&mut self, code: i32) -> Result<()>;

    /// Whether statements accept placeholders of `style`.
    fn supports_parameters(&self, style: ParameterStyle) -> bool;

    /// Character used to quote identifiers.
    fn identifier_quote_symbol(&self) -> char;
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"((?:[0-9]{1,2}\.){1,3}[0-9]{1,2})").expect("Invalid version pattern")
    })
}

/// Adapter shim over a shared modern connection.
pub struct Adapter {
    connection: Arc<dyn Connection>,
    config: AdapterConfig,
    numeric_types: NumericTypes,
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("platform", &self.connection.platform().name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Adapter {
    /// Creates an adapter over `connection`. The connection is not opened
    /// until an operation needs it.
    pub fn new(connection: Arc<dyn Connection>, config: AdapterConfig) -> Self {
        Self {
            connection,
            config,
            numeric_types: NumericTypes::mysql(),
        }
    }

    /// The wrapped connection.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Configuration the adapter was built with.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Default fetch mode handed to new statements.
    pub fn fetch_mode(&self) -> FetchMode {
        self.config.fetch_mode
    }

    /// Numeric classification of type names used when quoting.
    pub fn numeric_types(&self) -> &NumericTypes {
        &self.numeric_types
    }

    /// Prepares and executes a statement in one step.
    pub fn query(&self, source: QuerySource<'_>, bind: Option<Params>) -> Result<Statement<'_>> {
        let mut statement = Statement::new(self, source, bind);
        statement.execute(None)?;
        Ok(statement)
    }

    /// Every row of a query, in the adapter's default fetch mode.
    pub fn fetch_all(&self, source: QuerySource<'_>, bind: Option<Params>) -> Result<Vec<Row>> {
        self.query(source, bind)?.fetch_all(None)
    }

    /// First row of a query, in the adapter's default fetch mode.
    pub fn fetch_row(&self, source: QuerySource<'_>, bind: Option<Params>) -> Result<Option<Row>> {
        self.query(source, bind)?.fetch(None, None, 0)
    }

    /// First column of every row.
    pub fn fetch_col(&self, source: QuerySource<'_>, bind: Option<Params>) -> Result<Vec<Value>> {
        let mut statement = self.query(source, bind)?;
        let mut column = Vec::new();
        while let Some(row) = statement.fetch(Some(FetchMode::Num), None, 0)? {
            if let Some(value) = row.into_values().into_iter().next() {
                column.push(value);
            }
        }
        Ok(column)
    }

    /// First column of the first row.
    pub fn fetch_one(&self, source: QuerySource<'_>, bind: Option<Params>) -> Result<Option<Value>> {
        let row = self.query(source, bind)?.fetch(Some(FetchMode::Num), None, 0)?;
        Ok(row.and_then(|r| r.into_values().into_iter().next()))
    }

    /// First column of each row keyed to its second column. Later rows win
    /// on duplicate keys.
    pub fn fetch_pairs(
        &self,
        source: QuerySource<'_>,
        bind: Option<Params>,
    ) -> Result<IndexMap<String, Value>> {
        let mut statement = self.query(source, bind)?;
        let mut pairs = IndexMap::new();
        while let Some(row) = statement.fetch(Some(FetchMode::Num), None, 0)? {
            let mut values = row.into_values().into_iter();
            let (Some(key), value) = (values.next(), values.next()) else {
                continue;
            };
            let key = key.as_text().map(|k| k.into_owned()).unwrap_or_default();
            pairs.insert(key, value.unwrap_or(Value::Null));
        }
        Ok(pairs)
    }

    /// Quotes a value, rendering it as a numeric literal when `type_token`
    /// names a numeric type.
    ///
    /// # Example
    /// ```rust,ignore
    /// assert_eq!(adapter.quote_typed(&Value::from("12abc"), "INT".into()), "12");
    /// assert_eq!(adapter.quote_typed(&Value::from("1.5"), "DECIMAL".into()), "1.500000");
    /// ```
    pub fn quote_typed(&self, value: &Value, type_token: TypeToken<'_>) -> String {
        match self.numeric_types.classify(type_token) {
            Some(class) => class.render(&value.as_text().unwrap_or_default()),
            None => self.quote(value),
        }
    }

    /// Replaces `?` placeholders in `text` with the quoted value. Only the
    /// first `count` placeholders are replaced when a count is given.
    pub fn quote_into(
        &self,
        text: &str,
        value: &Value,
        type_token: Option<TypeToken<'_>>,
        count: Option<usize>,
    ) -> String {
        let quoted = match type_token {
            Some(token) => self.quote_typed(value, token),
            None => self.quote(value),
        };
        match count {
            Some(n) => text.replacen('?', &quoted, n),
            None => text.replace('?', &quoted),
        }
    }

    /// Quotes a possibly dotted identifier with the platform quote symbol.
    ///
    /// Returned unchanged when identifier auto-quoting is disabled.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        if !self.config.auto_quote_identifiers {
            return identifier.to_string();
        }
        let q = self.identifier_quote_symbol();
        let doubled = format!("{q}{q}");
        identifier
            .split('.')
            .map(|part| format!("{q}{}{q}", part.replace(q, &doubled)))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Applies the configured case-folding policy to an identifier.
    pub fn fold_case(&self, identifier: &str) -> String {
        self.config.case_folding.apply(identifier)
    }

    fn ensure_connected(&self) -> Result<()> {
        LegacyAdapter::connect(self)
    }
}

impl LegacyAdapter for Adapter {
    fn connect(&self) -> Result<()> {
        if self.connection.is_connected() {
            return Ok(());
        }
        tracing::debug!("Connecting to {} server", self.connection.platform().name);
        self.connection
            .connect()
            .map_err(|e| ShimError::adapter("Failed to connect", e))
    }

    fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    fn close_connection(&self) {
        tracing::debug!("Closing connection");
        self.connection.close();
    }

    fn prepare(&self, source: QuerySource<'_>) -> Result<Statement<'_>> {
        let mut statement = Statement::new(self, source, None);
        statement.prepare()?;
        Ok(statement)
    }

    fn quote(&self, value: &Value) -> String {
        match value {
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            other => self
                .connection
                .quote(&other.as_text().unwrap_or_default()),
        }
    }

    fn limit(&self, sql: &str, count: i64, offset: i64) -> Result<String> {
        if count <= 0 {
            return Err(ShimError::validation(format!(
                "LIMIT argument count={} is not valid",
                count
            )));
        }
        if offset < 0 {
            return Err(ShimError::validation(format!(
                "LIMIT argument offset={} is not valid",
                offset
            )));
        }

        let mut sql = format!("{} LIMIT {}", sql, count);
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let result = self
            .connection
            .execute("SHOW TABLES", &[])
            .map_err(|e| ShimError::adapter("Failed to list tables", e))?;

        let tables: Vec<String> = result
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_text))
            .map(|name| name.into_owned())
            .collect();

        tracing::debug!("Found {} tables", tables.len());
        Ok(tables)
    }

    fn describe_table(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<IndexMap<String, ColumnDescriptor>> {
        self.ensure_connected()?;

        let target = match schema {
            Some(schema) => format!("{}.{}", schema, table),
            None => table.to_string(),
        };
        let sql = format!("DESCRIBE {}", self.quote_identifier(&target));
        let result = self
            .connection
            .execute(&sql, &[])
            .map_err(|e| ShimError::adapter(format!("Failed to describe table {}", target), e))?;

        let mut primary_counter = 0;
        let mut columns = IndexMap::with_capacity(result.rows.len());
        for (row, position) in result.rows.iter().zip(1u32..) {
            let row = DescribeRow::from_values(row)?;
            let column = parse_describe_row(
                &row,
                schema,
                table,
                self.config.case_folding,
                position,
                &mut primary_counter,
            );
            columns.insert(column.column_name.clone(), column);
        }

        tracing::debug!("Described {} columns of {}", columns.len(), target);
        Ok(columns)
    }

    fn begin_transaction(&self) -> Result<()> {
        self.ensure_connected()?;
        tracing::debug!("Beginning transaction");
        self.connection
            .begin_transaction()
            .map_err(|e| ShimError::adapter("Failed to begin transaction", e))
    }

    fn commit(&self) -> Result<()> {
        self.ensure_connected()?;
        tracing::debug!("Committing transaction");
        self.connection
            .commit()
            .map_err(|e| ShimError::adapter("Failed to commit transaction", e))
    }

    fn roll_back(&self) -> Result<()> {
        self.ensure_connected()?;
        tracing::debug!("Rolling back transaction");
        self.connection
            .roll_back()
            .map_err(|e| ShimError::adapter("Failed to roll back transaction", e))
    }

    fn last_insert_id(&self, _table: Option<&str>, _primary_key: Option<&str>) -> Result<String> {
        self.ensure_connected()?;
        self.connection
            .last_insert_id()
            .map_err(|e| ShimError::adapter("Failed to read last insert id", e))
    }

    fn server_version(&self) -> Option<String> {
        if let Err(e) = self.ensure_connected() {
            tracing::warn!("Cannot read server version: {}", e);
            return None;
        }
        let raw = match self.connection.server_attribute(ServerAttribute::ServerVersion) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cannot read server version: {}", e);
                return None;
            }
        };
        version_pattern()
            .captures(&raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn set_fetch_mode(&mut self, code: i32) -> Result<()> {
        self.config.fetch_mode = FetchMode::try_from(code)?;
        tracing::debug!("Default fetch mode set to {:?}", self.config.fetch_mode);
        Ok(())
    }

    fn supports_parameters(&self, style: ParameterStyle) -> bool {
        matches!(style, ParameterStyle::Positional | ParameterStyle::Named)
    }

    fn identifier_quote_symbol(&self) -> char {
        self.connection.platform().identifier_quote
    }
}
