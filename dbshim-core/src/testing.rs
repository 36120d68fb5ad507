//! Scriptable in-memory connection used by the unit tests.

use crate::connection::{
    Connection, DriverStatement, ErrorInfo, Platform, ResultSet, ServerAttribute,
};
use crate::error::{DriverError, DriverResult};
use crate::models::{ParamKey, ParamType, Params, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    connect_count: usize,
    prepare_count: usize,
    close_cursor_count: usize,
    in_transaction: bool,
    commits: usize,
    bound_keys: Vec<ParamKey>,
    last_execute_params: Option<Params>,
    executed_sql: Vec<String>,
}

#[derive(Debug, Clone)]
struct Scripted {
    prefix: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Connection whose results are scripted per SQL prefix. The longest
/// matching prefix wins; unmatched SQL yields an empty result.
#[derive(Debug, Default)]
pub(crate) struct MockConnection {
    scripted: Vec<Scripted>,
    failing: Vec<String>,
    version: Option<String>,
    fail_connect: bool,
    fail_attributes: bool,
    last_insert_id: String,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self {
            version: Some("8.0.36-log".to_string()),
            last_insert_id: "0".to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn with_result(mut self, prefix: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.scripted.push(Scripted {
            prefix: prefix.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        });
        self
    }

    pub(crate) fn with_tables(self, tables: &[&str]) -> Self {
        let rows = tables.iter().map(|t| vec![Value::from(*t)]).collect();
        self.with_result("SHOW TABLES", &["Tables_in_app"], rows)
    }

    pub(crate) fn failing_execute(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    pub(crate) fn with_version(mut self, version: Option<&str>) -> Self {
        self.version = version.map(str::to_string);
        self
    }

    pub(crate) fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub(crate) fn failing_attributes(mut self) -> Self {
        self.fail_attributes = true;
        self
    }

    pub(crate) fn with_last_insert_id(mut self, id: &str) -> Self {
        self.last_insert_id = id.to_string();
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup(&self, sql: &str) -> (Vec<String>, Vec<Vec<Value>>) {
        self.scripted
            .iter()
            .filter(|s| sql.starts_with(&s.prefix))
            .max_by_key(|s| s.prefix.len())
            .map(|s| (s.columns.clone(), s.rows.clone()))
            .unwrap_or_default()
    }

    fn fails(&self, sql: &str) -> bool {
        self.failing.iter().any(|prefix| sql.starts_with(prefix))
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.state().connect_count
    }

    pub(crate) fn prepare_count(&self) -> usize {
        self.state().prepare_count
    }

    pub(crate) fn close_cursor_count(&self) -> usize {
        self.state().close_cursor_count
    }

    pub(crate) fn in_transaction(&self) -> bool {
        self.state().in_transaction
    }

    pub(crate) fn commits(&self) -> usize {
        self.state().commits
    }

    pub(crate) fn bound_keys(&self) -> Vec<ParamKey> {
        self.state().bound_keys.clone()
    }

    pub(crate) fn last_execute_params(&self) -> Option<Params> {
        self.state().last_execute_params.clone()
    }

    pub(crate) fn executed_sql(&self) -> Vec<String> {
        self.state().executed_sql.clone()
    }
}

impl Connection for MockConnection {
    fn connect(&self) -> DriverResult<()> {
        if self.fail_connect {
            return Err(DriverError::new("28000", "Access denied for user 'app'").with_code(1045));
        }
        let mut state = self.state();
        state.connected = true;
        state.connect_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    fn close(&self) {
        self.state().connected = false;
    }

    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn DriverStatement>> {
        let mut state = self.state();
        if !state.connected {
            return Err(DriverError::not_connected());
        }
        state.prepare_count += 1;
        let (columns, rows) = self.lookup(sql);
        Ok(Box::new(MockStatement {
            columns,
            rows,
            fail: self.fails(sql),
            cursor: None,
            row_count: 0,
            last_error: None,
            ran: false,
            state: Arc::clone(&self.state),
        }))
    }

    fn begin_transaction(&self) -> DriverResult<()> {
        let mut state = self.state();
        if state.in_transaction {
            return Err(DriverError::new("25000", "There is already an active transaction"));
        }
        state.in_transaction = true;
        Ok(())
    }

    fn commit(&self) -> DriverResult<()> {
        let mut state = self.state();
        if !state.in_transaction {
            return Err(DriverError::new("25000", "There is no active transaction"));
        }
        state.in_transaction = false;
        state.commits += 1;
        Ok(())
    }

    fn roll_back(&self) -> DriverResult<()> {
        let mut state = self.state();
        if !state.in_transaction {
            return Err(DriverError::new("25000", "There is no active transaction"));
        }
        state.in_transaction = false;
        Ok(())
    }

    fn last_insert_id(&self) -> DriverResult<String> {
        Ok(self.last_insert_id.clone())
    }

    fn server_attribute(&self, attribute: ServerAttribute) -> DriverResult<Option<String>> {
        if self.fail_attributes {
            return Err(DriverError::general(format!("Attribute {:?} unavailable", attribute)));
        }
        Ok(self.version.clone())
    }

    fn platform(&self) -> Platform {
        Platform {
            name: "MySQL",
            identifier_quote: '`',
        }
    }

    fn execute(&self, sql: &str, params: &[(ParamKey, Value)]) -> DriverResult<ResultSet> {
        let mut state = self.state();
        if !state.connected {
            return Err(DriverError::not_connected());
        }
        state.executed_sql.push(sql.to_string());
        state.last_execute_params = Some(params.to_vec());
        if self.fails(sql) {
            return Err(DriverError::new("42S02", "Table doesn't exist").with_code(1146));
        }
        let (columns, rows) = self.lookup(sql);
        Ok(ResultSet {
            affected_rows: rows.len() as u64,
            columns,
            rows,
        })
    }
}

#[derive(Debug)]
pub(crate) struct MockStatement {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    fail: bool,
    cursor: Option<VecDeque<Vec<Value>>>,
    row_count: u64,
    last_error: Option<DriverError>,
    ran: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockStatement {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DriverStatement for MockStatement {
    fn execute(&mut self, params: Option<&Params>) -> DriverResult<bool> {
        self.ran = true;
        self.state().last_execute_params = params.cloned();
        if self.fail {
            let error = DriverError::general("Lock wait timeout exceeded").with_code(1205);
            self.last_error = Some(error.clone());
            return Err(error);
        }
        self.last_error = None;
        self.row_count = self.rows.len() as u64;
        self.cursor = Some(self.rows.iter().cloned().collect());
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
        _value: Value,
        _param_type: ParamType,
        _length: Option<usize>,
    ) -> DriverResult<()> {
        self.state().bound_keys.push(key.clone());
        Ok(())
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn close_cursor(&mut self) -> DriverResult<bool> {
        self.cursor = None;
        self.state().close_cursor_count += 1;
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
