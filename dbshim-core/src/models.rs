//! Core data models shared by the adapter shim, the statement shim and the
//! driver traits.
//!
//! Values crossing the shim are dynamically typed ([`Value`]) because the
//! legacy contract binds and returns loosely-typed scalars. Column metadata
//! produced by table introspection is carried by [`ColumnDescriptor`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A bind value or a fetched cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// True for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for integer and floating-point values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Textual form of the value as the legacy contract sees it.
    ///
    /// NULL has no textual form; booleans render as `1`/`0`; bytes are
    /// decoded lossily.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(Cow::Borrowed(if *b { "1" } else { "0" })),
            Self::Int(i) => Some(Cow::Owned(i.to_string())),
            Self::Float(f) => Some(Cow::Owned(f.to_string())),
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Bytes(b) => Some(String::from_utf8_lossy(b)),
        }
    }

    /// Truthiness following the legacy scalar rules.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty() && s != "0",
            Self::Bytes(b) => !b.is_empty(),
        }
    }

    /// Converts the value to the representation a bind type asks for.
    ///
    /// NULL stays NULL for every type.
    pub fn coerce(self, param_type: ParamType) -> Self {
        if self.is_null() {
            return self;
        }
        match param_type {
            ParamType::Null => Self::Null,
            ParamType::Bool => Self::Bool(self.is_truthy()),
            ParamType::Int => match self {
                Self::Int(_) => self,
                Self::Bool(b) => Self::Int(i64::from(b)),
                // Truncation toward zero matches the legacy integer cast.
                #[allow(clippy::cast_possible_truncation)]
                Self::Float(f) => Self::Int(f as i64),
                other => Self::Int(leading_int(&other.as_text().unwrap_or_default())),
            },
            ParamType::Str => match self {
                Self::Text(_) => self,
                other => Self::Text(other.as_text().unwrap_or_default().into_owned()),
            },
            ParamType::Lob => match self {
                Self::Bytes(_) => self,
                Self::Text(s) => Self::Bytes(s.into_bytes()),
                other => Self::Bytes(other.as_text().unwrap_or_default().as_bytes().to_vec()),
            },
        }
    }
}

/// Parses the leading integer of a string, the way a legacy integer cast
/// does: optional whitespace and sign, then digits; anything else yields 0.
pub(crate) fn leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(if end == 0 { 0 } else { i64::MAX });
    if negative { -magnitude } else { magnitude }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Bind parameter type, with the legacy numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Null = 0,
    Int = 1,
    Str = 2,
    Lob = 3,
    Bool = 5,
}

impl ParamType {
    /// Infers a bind type from a value when the caller gave none.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Bool,
            Value::Null => Self::Null,
            Value::Int(_) => Self::Int,
            _ => Self::Str,
        }
    }

    /// Legacy numeric code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for ParamType {
    type Error = crate::error::ShimError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Null),
            1 => Ok(Self::Int),
            2 => Ok(Self::Str),
            3 => Ok(Self::Lob),
            5 => Ok(Self::Bool),
            other => Err(crate::error::ShimError::validation(format!(
                "Invalid parameter type code {}",
                other
            ))),
        }
    }
}

/// Identifies a bind parameter: a 1-based position or a `:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    Position(usize),
    Name(String),
}

impl ParamKey {
    /// Named parameter, normalized to carry a leading `:`.
    pub fn name(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        if name.starts_with(':') {
            Self::Name(name.to_string())
        } else {
            Self::Name(format!(":{}", name))
        }
    }

    /// Returns the key with named parameters normalized.
    pub fn normalized(self) -> Self {
        match self {
            Self::Name(name) => Self::name(name),
            position => position,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "{}", p),
            Self::Name(n) => f.write_str(n),
        }
    }
}

impl From<usize> for ParamKey {
    fn from(position: usize) -> Self {
        Self::Position(position)
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        Self::name(name)
    }
}

/// Ordered list of parameters for a single execution.
pub type Params = Vec<(ParamKey, Value)>;

/// Identifier case-folding policy applied to introspected names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseFolding {
    /// Keep identifiers as the server reports them
    #[default]
    Natural,
    Upper,
    Lower,
}

impl CaseFolding {
    /// Folds an identifier according to the policy.
    pub fn apply(self, identifier: &str) -> String {
        match self {
            Self::Natural => identifier.to_string(),
            Self::Upper => identifier.to_uppercase(),
            Self::Lower => identifier.to_lowercase(),
        }
    }
}

impl std::str::FromStr for CaseFolding {
    type Err = crate::error::ShimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "natural" | "0" => Ok(Self::Natural),
            "upper" | "1" => Ok(Self::Upper),
            "lower" | "2" => Ok(Self::Lower),
            other => Err(crate::error::ShimError::configuration(format!(
                "Unknown case folding '{}': expected natural, upper or lower",
                other
            ))),
        }
    }
}

/// Normalized metadata for one column, as returned by `describe_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ColumnDescriptor {
    /// Schema passed to `describe_table`, if any
    pub schema_name: Option<String>,
    /// Table name after case folding
    pub table_name: String,
    /// Column name after case folding
    pub column_name: String,
    /// 1-based position in the table
    pub column_position: u32,
    /// Type name with size hints stripped (e.g. `varchar`)
    pub data_type: String,
    /// Default value text
    pub default: Option<String>,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Character length for `char`/`varchar`
    pub length: Option<u32>,
    /// Digits after the decimal point
    pub scale: Option<u32>,
    /// Total digits of numeric types
    pub precision: Option<u32>,
    /// Whether a numeric type is unsigned
    pub unsigned: bool,
    /// Whether the column is part of the primary key
    pub primary: bool,
    /// 1-based position within the primary key
    pub primary_position: Option<u32>,
    /// Value generated by the engine on insert
    pub identity: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_type_inference() {
        assert_eq!(ParamType::infer(&Value::Bool(true)), ParamType::Bool);
        assert_eq!(ParamType::infer(&Value::Null), ParamType::Null);
        assert_eq!(ParamType::infer(&Value::Int(7)), ParamType::Int);
        assert_eq!(ParamType::infer(&Value::Float(1.5)), ParamType::Str);
        assert_eq!(ParamType::infer(&Value::from("x")), ParamType::Str);
    }

    #[test]
    fn test_param_type_codes() {
        assert_eq!(ParamType::try_from(5).ok(), Some(ParamType::Bool));
        assert_eq!(ParamType::Lob.code(), 3);
        assert!(ParamType::try_from(4).is_err());
    }

    #[test]
    fn test_param_key_normalization() {
        assert_eq!(ParamKey::from("id"), ParamKey::Name(":id".to_string()));
        assert_eq!(ParamKey::from(":id"), ParamKey::Name(":id".to_string()));
        assert_eq!(
            ParamKey::Name("id".to_string()).normalized(),
            ParamKey::Name(":id".to_string())
        );
        assert_eq!(ParamKey::from(2usize).to_string(), "2");
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(Value::from("42abc").coerce(ParamType::Int), Value::Int(42));
        assert_eq!(Value::from("abc").coerce(ParamType::Int), Value::Int(0));
        assert_eq!(Value::Int(3).coerce(ParamType::Str), Value::from("3"));
        assert_eq!(Value::from("0").coerce(ParamType::Bool), Value::Bool(false));
        assert_eq!(Value::Null.coerce(ParamType::Int), Value::Null);
        assert_eq!(
            Value::from("ab").coerce(ParamType::Lob),
            Value::Bytes(b"ab".to_vec())
        );
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("  -12px"), -12);
        assert_eq!(leading_int("+7"), 7);
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("x1"), 0);
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(CaseFolding::Upper.apply("Users"), "USERS");
        assert_eq!(CaseFolding::Lower.apply("Users"), "users");
        assert_eq!(CaseFolding::Natural.apply("Users"), "Users");
        assert_eq!("UPPER".parse::<CaseFolding>().ok(), Some(CaseFolding::Upper));
        assert!("sideways".parse::<CaseFolding>().is_err());
    }

    #[test]
    fn test_column_descriptor_field_names() {
        let column = ColumnDescriptor {
            schema_name: None,
            table_name: "users".to_string(),
            column_name: "id".to_string(),
            column_position: 1,
            data_type: "int".to_string(),
            default: None,
            nullable: false,
            length: None,
            scale: None,
            precision: None,
            unsigned: true,
            primary: true,
            primary_position: Some(1),
            identity: true,
        };

        let json = serde_json::to_value(&column).unwrap();
        for field in [
            "SCHEMA_NAME",
            "TABLE_NAME",
            "COLUMN_NAME",
            "COLUMN_POSITION",
            "DATA_TYPE",
            "DEFAULT",
            "NULLABLE",
            "LENGTH",
            "SCALE",
            "PRECISION",
            "UNSIGNED",
            "PRIMARY",
            "PRIMARY_POSITION",
            "IDENTITY",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
    }
}
