//! Conversion between sqlx MySQL rows/arguments and shim values.

use crate::error::DriverError;
use crate::models::Value;
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Row, TypeInfo, ValueRef};

/// Maps a sqlx error onto the driver error triple.
pub(crate) fn driver_error(error: sqlx::Error) -> DriverError {
    match &error {
        sqlx::Error::Database(db) => {
            let sqlstate = db
                .code()
                .map_or_else(|| "HY000".to_string(), |code| code.into_owned());
            let mapped = DriverError::new(sqlstate, db.message());
            match db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                Some(mysql) => mapped.with_code(i64::from(mysql.number())),
                None => mapped,
            }
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => DriverError::new("08001", error.to_string()),
        _ => DriverError::general(error.to_string()),
    }
}

/// Binds one shim value to a query.
pub(crate) fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(b),
        Value::Int(i) => query.bind(i),
        Value::Float(f) => query.bind(f),
        Value::Text(s) => query.bind(s),
        Value::Bytes(b) => query.bind(b),
    }
}

/// Decodes every cell of a row into positional values.
///
/// `binary` tells whether the row came over the prepared-statement protocol;
/// temporal values MySQL cannot express as chrono types are rebuilt from the
/// wire bytes accordingly.
pub(crate) fn decode_row(row: &MySqlRow, binary: bool) -> Result<Vec<Value>, DriverError> {
    (0..row.len())
        .map(|index| decode_cell(row, index, binary))
        .collect()
}

fn decode_cell(row: &MySqlRow, index: usize, binary: bool) -> Result<Value, DriverError> {
    let raw = row.try_get_raw(index).map_err(driver_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        // TINYINT(1) is reported as BOOLEAN but may hold any tinyint value
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Int(row.try_get_unchecked::<i64, _>(index).map_err(driver_error)?)
        }
        name if name.ends_with("UNSIGNED") || name == "BIT" => {
            let unsigned = row.try_get_unchecked::<u64, _>(index).map_err(driver_error)?;
            // Values past i64::MAX keep their exact digits as text
            i64::try_from(unsigned).map_or_else(|_| Value::Text(unsigned.to_string()), Value::Int)
        }
        "FLOAT" => Value::Float(f64::from(
            row.try_get_unchecked::<f32, _>(index).map_err(driver_error)?,
        )),
        "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(index).map_err(driver_error)?),
        "DATE" => match row.try_get_unchecked::<chrono::NaiveDate, _>(index) {
            Ok(date) => Value::Text(date.format("%Y-%m-%d").to_string()),
            Err(_) => Value::Text(temporal_fallback(row, index, binary, false)?),
        },
        "DATETIME" | "TIMESTAMP" => match row.try_get_unchecked::<chrono::NaiveDateTime, _>(index)
        {
            Ok(datetime) => Value::Text(datetime.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Err(_) => Value::Text(temporal_fallback(row, index, binary, true)?),
        },
        // TIME is an interval (-838:59:59 to 838:59:59), not a time of day
        "TIME" => Value::Text(format_time(
            &row.try_get_unchecked::<MySqlTime, _>(index).map_err(driver_error)?,
        )),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index).map_err(driver_error)?;
            String::from_utf8(bytes).map_or_else(|e| Value::Bytes(e.into_bytes()), Value::Text)
        }
        // DECIMAL, JSON, ENUM, SET and every character type
        _ => Value::Text(row.try_get_unchecked::<String, _>(index).map_err(driver_error)?),
    };
    Ok(value)
}

/// Text of a DATE/DATETIME cell chrono rejected, such as `0000-00-00`.
fn temporal_fallback(
    row: &MySqlRow,
    index: usize,
    binary: bool,
    with_time: bool,
) -> Result<String, DriverError> {
    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index).map_err(driver_error)?;
    if binary {
        Ok(format_binary_datetime(&bytes, with_time))
    } else {
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Formats a binary-protocol DATE/DATETIME value: a length byte followed by
/// year (u16 LE), month, day, then optionally hour, minute, second and
/// microseconds (u32 LE). A zero length is the all-zero date.
fn format_binary_datetime(bytes: &[u8], with_time: bool) -> String {
    let payload = bytes.get(1..).unwrap_or_default();
    let byte = |i: usize| payload.get(i).copied().unwrap_or(0);

    let year = u16::from_le_bytes([byte(0), byte(1)]);
    let mut text = format!("{:04}-{:02}-{:02}", year, byte(2), byte(3));
    if with_time {
        text.push_str(&format!(" {:02}:{:02}:{:02}", byte(4), byte(5), byte(6)));
        if payload.len() >= 11 {
            let micros = u32::from_le_bytes([byte(7), byte(8), byte(9), byte(10)]);
            text.push_str(&format!(".{:06}", micros));
        }
    }
    text
}

/// Formats a TIME value as MySQL prints it, e.g. `-01:00:00` or `838:59:59`.
fn format_time(time: &MySqlTime) -> String {
    let mut text = format!(
        "{}{:02}:{:02}:{:02}",
        if time.is_negative() { "-" } else { "" },
        time.hours(),
        time.minutes(),
        time.seconds()
    );
    if time.microseconds() != 0 {
        text.push_str(&format!(".{:06}", time.microseconds()));
    }
    text
}
