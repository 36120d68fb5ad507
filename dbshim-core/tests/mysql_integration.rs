//! MySQL integration tests for the adapter and statement shims.
//!
//! This test suite covers:
//! - Table listing and `DESCRIBE` parsing against a real server
//! - Pagination, binding and fetch styles
//! - Transaction control and last insert id
//! - Server version detection

#![cfg(feature = "mysql")]

use dbshim_core::drivers::mysql::MySqlConnection;
use dbshim_core::{
    Adapter, AdapterConfig, CaseFolding, Connection, FetchMode, LegacyAdapter, ParamKey, ParamType,
    Result, Row, ShimError, Value,
};
use std::sync::Arc;
use std::time::Duration;
use testcontainers_modules::mysql::Mysql;
use testcontainers_modules::testcontainers::Container;
use testcontainers_modules::testcontainers::runners::SyncRunner;

/// Starts a MySQL container and returns it with a connected adapter.
fn start_mysql(config: AdapterConfig) -> (Container<Mysql>, Adapter) {
    let mysql = Mysql::default().start().unwrap();
    let port = mysql.get_host_port_ipv4(3306).unwrap();
    let database_url = format!("mysql://root@127.0.0.1:{}/test", port);

    let connection = Arc::new(MySqlConnection::new(&database_url).unwrap());
    wait_for_mysql_ready(&connection, 30).unwrap();

    (mysql, Adapter::new(connection, config))
}

/// Helper function to wait for MySQL to be ready
fn wait_for_mysql_ready(connection: &MySqlConnection, max_attempts: u32) -> Result<()> {
    let mut attempts = 0;
    loop {
        match connection.connect() {
            Ok(()) => return Ok(()),
            Err(e) if attempts + 1 >= max_attempts => {
                return Err(ShimError::adapter("MySQL failed to become ready", e));
            }
            Err(_) => {
                attempts += 1;
                std::thread::sleep(Duration::from_millis(500));
            }
        }
    }
}

fn create_schema(adapter: &Adapter) {
    for sql in [
        "CREATE TABLE users (
            id INT(11) UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(255) NULL,
            balance DECIMAL(10,2) NOT NULL DEFAULT 0.00,
            active TINYINT(1) NOT NULL DEFAULT 1,
            created_at DATETIME NULL
        )",
        "CREATE TABLE order_lines (
            order_id BIGINT NOT NULL,
            line_no SMALLINT NOT NULL,
            sku CHAR(8) NOT NULL,
            PRIMARY KEY (order_id, line_no)
        )",
    ] {
        adapter.query(sql.into(), None).unwrap();
    }
}

#[test]
fn test_mysql_list_and_describe_tables() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());
    create_schema(&adapter);

    let mut tables = adapter.list_tables().unwrap();
    tables.sort();
    assert_eq!(tables, vec!["order_lines", "users"]);

    let columns = adapter.describe_table("users", None).unwrap();
    assert_eq!(
        columns.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["id", "name", "email", "balance", "active", "created_at"]
    );

    // MySQL 8 reports integers without a display width
    let id = &columns["id"];
    assert!(id.data_type.starts_with("int"), "{}", id.data_type);
    assert!(id.unsigned);
    assert!(id.primary);
    assert!(id.identity);
    assert_eq!(id.primary_position, Some(1));

    let name = &columns["name"];
    assert_eq!(name.data_type, "varchar");
    assert_eq!(name.length, Some(100));
    assert!(!name.nullable);

    assert!(columns["email"].nullable);

    let balance = &columns["balance"];
    assert_eq!(balance.data_type, "decimal");
    assert_eq!(balance.precision, Some(10));
    assert_eq!(balance.scale, Some(2));
    assert_eq!(balance.default.as_deref(), Some("0.00"));

    let lines = adapter.describe_table("order_lines", Some("test")).unwrap();
    assert_eq!(lines["order_id"].primary_position, Some(1));
    assert_eq!(lines["line_no"].primary_position, Some(2));
    assert!(!lines["order_id"].identity);
    assert_eq!(lines["sku"].length, Some(8));
    assert_eq!(lines["sku"].schema_name.as_deref(), Some("test"));
}

#[test]
fn test_mysql_case_folding() {
    let (_container, adapter) =
        start_mysql(AdapterConfig::default().with_case_folding(CaseFolding::Upper));
    create_schema(&adapter);

    let columns = adapter.describe_table("users", None).unwrap();
    assert!(columns.contains_key("EMAIL"));
    assert_eq!(columns["EMAIL"].table_name, "USERS");
}

#[test]
fn test_mysql_binding_and_fetch_styles() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());
    create_schema(&adapter);

    let mut insert = adapter
        .prepare("INSERT INTO users (name, email, active) VALUES (:name, :email, :active)".into())
        .unwrap();
    for (name, email) in [("alice", Some("a@example.com")), ("bob", None)] {
        insert.bind_value("name", name, None).unwrap();
        insert.bind_value(":email", email, None).unwrap();
        insert.bind_value("active", true, Some(ParamType::Bool)).unwrap();
        assert!(insert.execute(None).unwrap());
        assert_eq!(insert.row_count(), 1);
    }
    assert_eq!(adapter.last_insert_id(Some("users"), Some("id")).unwrap(), "2");

    let mut select = adapter
        .prepare("SELECT id, name, email FROM users WHERE id >= ? ORDER BY id".into())
        .unwrap();
    select.bind_value(1usize, 1, Some(ParamType::Int)).unwrap();
    select.execute(None).unwrap();

    let first = select.fetch(Some(FetchMode::Assoc), None, 0).unwrap().unwrap();
    assert_eq!(first.get("name"), Some(&Value::from("alice")));
    assert_eq!(first.get("email"), Some(&Value::from("a@example.com")));

    let second = select.fetch(Some(FetchMode::Num), None, 0).unwrap().unwrap();
    assert_eq!(second, Row::Num(vec![Value::Int(2), Value::from("bob"), Value::Null]));
    assert!(select.fetch(None, None, 0).unwrap().is_none());

    // Re-execute the same handle with an override
    select
        .execute(Some(vec![(ParamKey::Position(1), Value::Int(2))]))
        .unwrap();
    let rows = select.fetch_all(Some(FetchMode::Both)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("bob")));
    assert_eq!(rows[0].get_index(1), Some(&Value::from("bob")));
}

#[test]
fn test_mysql_tinyint_one_keeps_integer_value() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());
    create_schema(&adapter);
    adapter
        .query("INSERT INTO users (name, active) VALUES ('alice', 1), ('bob', 2)".into(), None)
        .unwrap();

    // Text protocol
    let active = adapter
        .fetch_one("SELECT active FROM users WHERE name = 'bob'".into(), None)
        .unwrap();
    assert_eq!(active, Some(Value::Int(2)));

    // Binary protocol
    let active = adapter
        .fetch_col(
            "SELECT active FROM users WHERE id >= ? ORDER BY id".into(),
            Some(vec![(ParamKey::Position(1), Value::Int(1))]),
        )
        .unwrap();
    assert_eq!(active, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_mysql_zero_dates_and_long_times() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());
    for sql in [
        "SET SESSION sql_mode = ''",
        "CREATE TABLE moments (
            id INT PRIMARY KEY,
            d DATE NULL,
            dt DATETIME NULL,
            t TIME NULL
        )",
        "INSERT INTO moments VALUES
            (1, '0000-00-00', '0000-00-00 00:00:00', '-01:00:00'),
            (2, '2024-02-29', '2024-02-29 13:05:09', '838:59:59')",
    ] {
        adapter.query(sql.into(), None).unwrap();
    }

    let expected = vec![
        vec![
            Value::from("0000-00-00"),
            Value::from("0000-00-00 00:00:00"),
            Value::from("-01:00:00"),
        ],
        vec![
            Value::from("2024-02-29"),
            Value::from("2024-02-29 13:05:09"),
            Value::from("838:59:59"),
        ],
    ];

    let text = adapter
        .fetch_all("SELECT d, dt, t FROM moments ORDER BY id".into(), None)
        .unwrap();
    let binary = adapter
        .fetch_all(
            "SELECT d, dt, t FROM moments WHERE id >= ? ORDER BY id".into(),
            Some(vec![(ParamKey::Position(1), Value::Int(1))]),
        )
        .unwrap();

    for rows in [text, binary] {
        let cells: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| {
                ["d", "dt", "t"]
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap())
                    .collect()
            })
            .collect();
        assert_eq!(cells, expected);
    }
}

#[test]
fn test_mysql_multi_statement_keeps_first_result_set() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());

    let result = adapter
        .connection()
        .execute("SELECT 1 AS a; SELECT 2 AS b, 3 AS c", &[])
        .unwrap();
    assert_eq!(result.columns, vec!["a"]);
    assert_eq!(result.rows, vec![vec![Value::Int(1)]]);

    // The connection is still usable after the extra result set
    assert_eq!(
        adapter.fetch_one("SELECT 5".into(), None).unwrap(),
        Some(Value::Int(5))
    );
}

#[test]
fn test_mysql_pagination_and_helpers() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());
    create_schema(&adapter);
    for name in ["a", "b", "c", "d"] {
        adapter
            .query(
                "INSERT INTO users (name) VALUES (?)".into(),
                Some(vec![(ParamKey::Position(1), Value::from(name))]),
            )
            .unwrap();
    }

    let sql = adapter
        .limit("SELECT name, id FROM users ORDER BY id", 2, 1)
        .unwrap();
    assert_eq!(
        adapter.fetch_col(sql.as_str().into(), None).unwrap(),
        vec![Value::from("b"), Value::from("c")]
    );

    let pairs = adapter
        .fetch_pairs("SELECT name, id FROM users".into(), None)
        .unwrap();
    assert_eq!(pairs["d"], Value::Int(4));

    let count = adapter
        .fetch_one("SELECT COUNT(*) FROM users".into(), None)
        .unwrap();
    assert_eq!(count, Some(Value::Int(4)));
}

#[test]
fn test_mysql_transactions() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());
    create_schema(&adapter);
    let count = || {
        adapter
            .fetch_one("SELECT COUNT(*) FROM users".into(), None)
            .unwrap()
    };

    adapter.begin_transaction().unwrap();
    adapter
        .query("INSERT INTO users (name) VALUES ('rolled back')".into(), None)
        .unwrap();
    adapter.roll_back().unwrap();
    assert_eq!(count(), Some(Value::Int(0)));

    adapter.begin_transaction().unwrap();
    adapter
        .query("INSERT INTO users (name) VALUES ('kept')".into(), None)
        .unwrap();
    adapter.commit().unwrap();
    assert_eq!(count(), Some(Value::Int(1)));

    let err = adapter.commit().unwrap_err();
    assert!(matches!(err, ShimError::Adapter { .. }));
    assert_eq!(err.code(), Some("25000"));
}

#[test]
fn test_mysql_server_version_and_errors() {
    let (_container, adapter) = start_mysql(AdapterConfig::default());

    let version = adapter.server_version().unwrap();
    assert!(version.split('.').count() >= 2, "unexpected version {}", version);

    let err = adapter.describe_table("missing_table", None).unwrap_err();
    assert_eq!(err.code(), Some("42S02"));
    assert_eq!(err.driver_error().and_then(|e| e.code), Some(1146));

    let mut stmt = adapter.prepare("SELECT 1 AS one".into()).unwrap();
    stmt.execute(None).unwrap();
    assert_eq!(stmt.error_code().as_deref(), Some("00000"));
    assert_eq!(stmt.fetch_column(0).unwrap(), Some(Value::Int(1)));

    adapter.close_connection();
    assert!(!adapter.connection().is_connected());
    assert!(adapter.list_tables().is_ok());
}
