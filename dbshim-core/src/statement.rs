//! Legacy statement semantics over a modern prepared-statement handle.
//!
//! A [`Statement`] moves through `Unprepared → Prepared → Executed →
//! Closed`. The modern handle is created once, on first prepare, and reused
//! by every later operation; closing the cursor keeps the handle so the
//! statement can be executed again.

use crate::adapter::{Adapter, LegacyAdapter};
use crate::connection::{DriverStatement, ErrorInfo};
use crate::error::ShimError;
use crate::fetch::{CursorOrientation, FetchMode, Row};
use crate::models::{ParamKey, ParamType, Params, Value};
use crate::Result;
use indexmap::IndexMap;
use std::borrow::Cow;

/// Opaque producer of SQL text and bind values, such as a select builder.
pub trait QueryBuilder {
    /// Renders the query to SQL text.
    fn assemble(&self) -> String;

    /// Bind values collected while the query was built.
    fn bind_values(&self) -> Params {
        Vec::new()
    }
}

/// What a statement is prepared from.
#[derive(Clone, Copy)]
pub enum QuerySource<'q> {
    /// Literal SQL text
    Sql(&'q str),
    /// A builder assembled into SQL at prepare time
    Builder(&'q dyn QueryBuilder),
}

impl<'q> From<&'q str> for QuerySource<'q> {
    fn from(sql: &'q str) -> Self {
        Self::Sql(sql)
    }
}

impl<'q> From<&'q String> for QuerySource<'q> {
    fn from(sql: &'q String) -> Self {
        Self::Sql(sql)
    }
}

impl<'q> From<&'q dyn QueryBuilder> for QuerySource<'q> {
    fn from(builder: &'q dyn QueryBuilder) -> Self {
        Self::Builder(builder)
    }
}

/// Lifecycle of a statement shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// No driver statement yet; it is created on first use
    Unprepared,
    /// Driver statement exists but has not run
    Prepared,
    /// Ran at least once; a cursor may be open
    Executed,
    /// Cursor closed; executing again reopens it
    Closed,
}

/// A parameter as last bound through the shim.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    /// Value as handed to the driver
    pub value: Value,
    /// Declared type, or the one inferred from the value
    pub param_type: ParamType,
    /// Length hint from `bind_param`, unused by the driver
    pub length: Option<usize>,
}

/// Statement shim wrapping one exclusively owned driver statement.
pub struct Statement<'a> {
    adapter: &'a Adapter,
    sql: String,
    handle: Option<Box<dyn DriverStatement>>,
    fetch_mode: FetchMode,
    bound: IndexMap<ParamKey, BoundParam>,
    /// Bind values pulled from a query builder, used when `execute` gets none
    default_params: Option<Params>,
    state: StatementState,
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("fetch_mode", &self.fetch_mode)
            .field("bound", &self.bound.len())
            .finish_non_exhaustive()
    }
}

fn normalize(params: Params) -> Params {
    params
        .into_iter()
        .map(|(key, value)| (key.normalized(), value))
        .collect()
}

impl<'a> Statement<'a> {
    /// Creates an unprepared statement. Builder sources are assembled to SQL
    /// here; their bind values become the default parameters unless `bind`
    /// is non-empty.
    pub(crate) fn new(adapter: &'a Adapter, source: QuerySource<'_>, bind: Option<Params>) -> Self {
        let bind = bind.filter(|b| !b.is_empty());
        let (sql, default_params) = match source {
            QuerySource::Sql(sql) => (sql.to_string(), bind),
            QuerySource::Builder(builder) => {
                let bind = bind.or_else(|| Some(builder.bind_values()).filter(|b| !b.is_empty()));
                (builder.assemble(), bind)
            }
        };

        Self {
            adapter,
            sql,
            handle: None,
            fetch_mode: adapter.fetch_mode(),
            bound: IndexMap::new(),
            default_params: default_params.map(normalize),
            state: StatementState::Unprepared,
        }
    }

    /// Obtains the driver handle, creating it on first use.
    fn handle(&mut self) -> Result<&mut Box<dyn DriverStatement>> {
        let handle = match &mut self.handle {
            Some(handle) => handle,
            slot @ None => {
                self.adapter.connect()?;
                let prepared = self
                    .adapter
                    .connection()
                    .prepare(&self.sql)
                    .map_err(|e| ShimError::statement("Failed to prepare statement", e))?;
                tracing::debug!("Prepared statement: {}", self.sql);
                self.state = StatementState::Prepared;
                slot.insert(prepared)
            }
        };
        Ok(handle)
    }

    /// Prepares the driver handle if that has not happened yet.
    pub fn prepare(&mut self) -> Result<()> {
        self.handle().map(|_| ())
    }

    /// SQL text the statement was prepared from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Parameters bound so far, keyed by normalized parameter key.
    pub fn bound_params(&self) -> &IndexMap<ParamKey, BoundParam> {
        &self.bound
    }

    /// Fetch style used when a fetch call names none.
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    /// Sets the statement fetch style from a legacy fetch-mode code.
    ///
    /// # Errors
    /// Returns a validation error for codes outside the five fetch styles.
    pub fn set_fetch_mode(&mut self, code: i32) -> Result<()> {
        self.fetch_mode = FetchMode::try_from(code)?;
        Ok(())
    }

    /// Executes the statement.
    ///
    /// `params` are merged over bound parameters for this execution only;
    /// when `None`, bind values supplied by a query builder are used.
    pub fn execute(&mut self, params: Option<Params>) -> Result<bool> {
        let params = params
            .map(normalize)
            .or_else(|| self.default_params.clone());

        let success = self
            .handle()?
            .execute(params.as_ref())
            .map_err(|e| ShimError::statement("Failed to execute statement", e))?;
        self.state = StatementState::Executed;

        tracing::debug!(
            "Executed statement ({} params): {}",
            params.as_ref().map_or(0, Vec::len),
            self.sql
        );
        Ok(success)
    }

    /// Fetches the next row.
    ///
    /// Only forward iteration is available: `orientation` must be `None` or
    /// [`CursorOrientation::Next`] and `offset` must be 0. Returns `None`
    /// when the cursor is exhausted or the statement was never executed.
    pub fn fetch(
        &mut self,
        style: Option<FetchMode>,
        orientation: Option<CursorOrientation>,
        offset: i64,
    ) -> Result<Option<Row>> {
        if let Some(orientation) = orientation
            && orientation != CursorOrientation::Next
        {
            return Err(ShimError::unsupported_feature(format!(
                "cursor orientation {:?}; statements only iterate forward",
                orientation
            )));
        }
        if offset != 0 {
            return Err(ShimError::unsupported_feature(format!(
                "cursor offset {}; statements only iterate forward",
                offset
            )));
        }

        let mode = style.unwrap_or(self.fetch_mode);
        self.handle()?
            .fetch(mode)
            .map_err(|e| ShimError::statement("Failed to fetch row", e))
    }

    /// Fetches every remaining row.
    pub fn fetch_all(&mut self, style: Option<FetchMode>) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch(style, None, 0)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Fetches one cell (0-based column index) from the next row.
    pub fn fetch_column(&mut self, index: usize) -> Result<Option<Value>> {
        match self.fetch(Some(FetchMode::Num), None, 0)? {
            None => Ok(None),
            Some(row) => {
                let width = row.len();
                row.into_values()
                    .into_iter()
                    .nth(index)
                    .map(Some)
                    .ok_or_else(|| {
                        ShimError::validation(format!(
                            "Column index {} out of range for row of {} columns",
                            index, width
                        ))
                    })
            }
        }
    }

    /// Binds a parameter by position (1-based) or name.
    ///
    /// Bare names are normalized to `:name`. Without an explicit type, the
    /// type is inferred from the value.
    pub fn bind_param(
        &mut self,
        key: impl Into<ParamKey>,
        value: impl Into<Value>,
        param_type: Option<ParamType>,
        length: Option<usize>,
    ) -> Result<bool> {
        let (key, value, param_type) = Self::resolve_bind(key.into(), value.into(), param_type)?;

        self.handle()?
            .bind_param(&key, value.clone(), param_type, length)
            .map_err(|e| ShimError::statement(format!("Failed to bind parameter {}", key), e))?;

        self.bound.insert(
            key,
            BoundParam {
                value,
                param_type,
                length,
            },
        );
        Ok(true)
    }

    /// Binds a value by position (1-based) or name.
    pub fn bind_value(
        &mut self,
        key: impl Into<ParamKey>,
        value: impl Into<Value>,
        param_type: Option<ParamType>,
    ) -> Result<bool> {
        let (key, value, param_type) = Self::resolve_bind(key.into(), value.into(), param_type)?;

        self.handle()?
            .bind_value(&key, value.clone(), param_type)
            .map_err(|e| ShimError::statement(format!("Failed to bind value {}", key), e))?;

        self.bound.insert(
            key,
            BoundParam {
                value,
                param_type,
                length: None,
            },
        );
        Ok(true)
    }

    fn resolve_bind(
        key: ParamKey,
        value: Value,
        param_type: Option<ParamType>,
    ) -> Result<(ParamKey, Value, ParamType)> {
        let key = key.normalized();
        if key == ParamKey::Position(0) {
            return Err(ShimError::validation("Invalid bind-variable position '0'"));
        }
        let param_type = param_type.unwrap_or_else(|| ParamType::infer(&value));
        Ok((key, value, param_type))
    }

    /// Rows affected by the last execution.
    pub fn row_count(&self) -> u64 {
        self.handle.as_ref().map_or(0, |h| h.row_count())
    }

    /// Number of columns in the result set.
    pub fn column_count(&self) -> usize {
        self.handle.as_ref().map_or(0, |h| h.column_count())
    }

    /// Releases the cursor. The statement may be executed again afterwards.
    pub fn close_cursor(&mut self) -> Result<bool> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(true);
        };
        let closed = handle
            .close_cursor()
            .map_err(|e| ShimError::statement("Failed to close cursor", e))?;
        self.state = StatementState::Closed;
        Ok(closed)
    }

    /// SQLSTATE of the last driver operation.
    pub fn error_code(&self) -> Option<String> {
        self.handle.as_ref().and_then(|h| h.error_code())
    }

    /// Error triple of the last driver operation.
    pub fn error_info(&self) -> ErrorInfo {
        self.handle
            .as_ref()
            .map_or_else(ErrorInfo::default, |h| h.error_info())
    }

    /// Advancing to another result set is not available on modern handles.
    pub fn next_rowset(&mut self) -> Result<bool> {
        Err(ShimError::not_implemented(
            "next_rowset: statement handles expose a single result set",
        ))
    }

    /// Forward-only, single-pass iterator over the remaining rows in
    /// associative shape.
    pub fn rows(&mut self) -> Rows<'_, 'a> {
        Rows {
            statement: self,
            done: false,
        }
    }

    /// SQL with bound parameter values inlined, for diagnostics only.
    pub fn debug_sql(&self) -> Cow<'_, str> {
        if self.bound.is_empty() {
            return Cow::Borrowed(&self.sql);
        }
        let rendered = self
            .bound
            .iter()
            .map(|(key, param)| format!("{}={:?}", key, param.value))
            .collect::<Vec<_>>()
            .join(", ");
        Cow::Owned(format!("{} [{}]", self.sql, rendered))
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if self.state == StatementState::Executed
            && let Some(handle) = self.handle.as_mut()
            && let Err(e) = handle.close_cursor()
        {
            tracing::debug!("Failed to close cursor on drop: {}", e);
        }
    }
}

/// Iterator returned by [`Statement::rows`].
pub struct Rows<'s, 'a> {
    statement: &'s mut Statement<'a>,
    done: bool,
}

impl Iterator for Rows<'_, '_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.statement.fetch(Some(FetchMode::Assoc), None, 0).transpose();
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        next
    }
}

impl<'s, 'a> IntoIterator for &'s mut Statement<'a> {
    type Item = Result<Row>;
    type IntoIter = Rows<'s, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}
