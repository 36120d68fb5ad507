//! Prepared statement handle for the MySQL driver.

use super::Shared;
use super::placeholders::Placeholders;
use crate::connection::{DriverStatement, ErrorInfo};
use crate::error::{DriverError, DriverResult};
use crate::models::{ParamKey, ParamType, Params, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Statement handle created by [`super::MySqlConnection`].
///
/// Results are buffered in full on execute; fetching drains the buffer.
pub struct MySqlStatement {
    shared: Arc<Shared>,
    sql: String,
    placeholders: Placeholders,
    columns: Vec<String>,
    bound: HashMap<ParamKey, Value>,
    cursor: Option<VecDeque<Vec<Value>>>,
    row_count: u64,
    last_error: Option<DriverError>,
    ran: bool,
}

impl std::fmt::Debug for MySqlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlStatement")
            .field("sql", &self.sql)
            .field("placeholders", &self.placeholders)
            .field("columns", &self.columns)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl MySqlStatement {
    pub(super) fn new(
        shared: Arc<Shared>,
        sql: String,
        placeholders: Placeholders,
        columns: Vec<String>,
    ) -> Self {
        Self {
            shared,
            sql,
            placeholders,
            columns,
            bound: HashMap::new(),
            cursor: None,
            row_count: 0,
            last_error: None,
            ran: false,
        }
    }

    /// Records the outcome of a driver call for `error_code`/`error_info`.
    fn track<T>(&mut self, result: DriverResult<T>) -> DriverResult<T> {
        self.ran = true;
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.clone()),
        }
        result
    }
}

impl DriverStatement for MySqlStatement {
    fn execute(&mut self, params: Option<&Params>) -> DriverResult<bool> {
        let values = self.placeholders.resolve(&self.bound, params);
        let values = self.track(values)?;

        let buffered = self.shared.run(&self.sql, values);
        let buffered = self.track(buffered)?;

        if !buffered.columns.is_empty() {
            self.columns = buffered.columns;
        }
        self.row_count = if buffered.rows.is_empty() {
            buffered.affected_rows
        } else {
            buffered.rows.len() as u64
        };
        self.cursor = Some(buffered.rows.into());
        Ok(true)
    }

    fn next_values(&mut self) -> DriverResult<Option<Vec<Value>>> {
        Ok(self.cursor.as_mut().and_then(VecDeque::pop_front))
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn bind_param(
        &mut self,
        key: &ParamKey,
        value: Value,
        param_type: ParamType,
        _length: Option<usize>,
    ) -> DriverResult<()> {
        let key = key.clone().normalized();
        if !self.placeholders.accepts(&key) {
            let error = DriverError::invalid_parameter(format!(
                "Invalid parameter number: parameter {} is not defined",
                key
            ));
            return self.track(Err(error));
        }
        self.bound.insert(key, value.coerce(param_type));
        Ok(())
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn close_cursor(&mut self) -> DriverResult<bool> {
        self.cursor = None;
        Ok(true)
    }

    fn error_code(&self) -> Option<String> {
        match &self.last_error {
            Some(error) => Some(error.sqlstate.clone()),
            None if self.ran => Some("00000".to_string()),
            None => None,
        }
    }

    fn error_info(&self) -> ErrorInfo {
        self.last_error
            .as_ref()
            .map_or_else(ErrorInfo::default, ErrorInfo::from)
    }
}
