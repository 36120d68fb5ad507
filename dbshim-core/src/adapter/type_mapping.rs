//! Numeric type classification.
//!
//! Maps SQL type names, and the three canonical numeric type codes of the
//! legacy contract, onto a numeric class. Used by typed quoting to decide
//! how a value should be rendered as a literal.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Numeric class of a SQL type, with the legacy canonical codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericClass {
    /// 32-bit integer
    Int32 = 0,
    /// 64-bit integer
    Int64 = 1,
    /// Floating point or fixed-point decimal
    FloatOrDecimal = 2,
}

impl NumericClass {
    /// Canonical type code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Class for a canonical type code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Int32),
            1 => Some(Self::Int64),
            2 => Some(Self::FloatOrDecimal),
            _ => None,
        }
    }

    /// Renders `text` as a literal of this class.
    ///
    /// - `Int32`: leading-integer cast, `0` when not numeric
    /// - `Int64`: leading decimal/hex/exponent literal, `0` when none
    /// - `FloatOrDecimal`: fixed notation with six decimals
    pub fn render(self, text: &str) -> String {
        match self {
            Self::Int32 => crate::models::leading_int(text).to_string(),
            Self::Int64 => bigint_pattern()
                .captures(text)
                .and_then(|c| c.get(1))
                .map_or_else(|| "0".to_string(), |m| m.as_str().to_string()),
            Self::FloatOrDecimal => format!("{:.6}", leading_float(text)),
        }
    }
}

fn bigint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:0[xX][0-9a-fA-F]+|[0-9]+(?:[eE][+-]?[0-9]+)?))")
            .expect("Invalid bigint literal pattern")
    })
}

fn leading_float(text: &str) -> f64 {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
            .expect("Invalid float literal pattern")
    });
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// A type token: either a canonical code or an SQL type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeToken<'a> {
    Code(u8),
    Name(&'a str),
}

impl<'a> From<&'a str> for TypeToken<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<NumericClass> for TypeToken<'_> {
    fn from(class: NumericClass) -> Self {
        Self::Code(class.code())
    }
}

/// Immutable classification table held by an adapter.
#[derive(Debug, Clone)]
pub struct NumericTypes {
    by_name: HashMap<&'static str, NumericClass>,
}

impl NumericTypes {
    /// Table for the MySQL dialect.
    pub fn mysql() -> Self {
        let entries = [
            ("INT", NumericClass::Int32),
            ("INTEGER", NumericClass::Int32),
            ("MEDIUMINT", NumericClass::Int32),
            ("SMALLINT", NumericClass::Int32),
            ("TINYINT", NumericClass::Int32),
            ("BIGINT", NumericClass::Int64),
            ("SERIAL", NumericClass::Int64),
            ("DEC", NumericClass::FloatOrDecimal),
            ("DECIMAL", NumericClass::FloatOrDecimal),
            ("DOUBLE", NumericClass::FloatOrDecimal),
            ("DOUBLE PRECISION", NumericClass::FloatOrDecimal),
            ("FIXED", NumericClass::FloatOrDecimal),
            ("FLOAT", NumericClass::FloatOrDecimal),
        ];
        Self {
            by_name: entries.into_iter().collect(),
        }
    }

    /// Classifies a token. Names match case-insensitively; unknown tokens
    /// yield `None`.
    pub fn classify(&self, token: TypeToken<'_>) -> Option<NumericClass> {
        match token {
            TypeToken::Code(code) => NumericClass::from_code(code),
            TypeToken::Name(name) => self
                .by_name
                .get(name.trim().to_uppercase().as_str())
                .copied(),
        }
    }

    /// Whether the token is a numeric type.
    pub fn contains(&self, token: TypeToken<'_>) -> bool {
        self.classify(token).is_some()
    }
}

impl Default for NumericTypes {
    fn default() -> Self {
        Self::mysql()
    }
}
