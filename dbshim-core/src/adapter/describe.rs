//! Column descriptor parsing for `DESCRIBE <table>` output.
//!
//! Each row of the describe result carries six positional text fields:
//! field, type, null, key, default and extra. The type text embeds size
//! hints (`varchar(255)`, `decimal(10,2)`, `int(11) unsigned`) which are
//! extracted by an ordered table of rules; the first matching rule wins.

use crate::error::ShimError;
use crate::models::{CaseFolding, ColumnDescriptor, Value};
use crate::Result;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// One positional row of `DESCRIBE` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeRow {
    /// Column name
    pub field: String,
    /// Full type text, e.g. `int(10) unsigned`
    pub type_text: String,
    /// `YES` when the column accepts NULL
    pub null: String,
    /// `PRI`, `UNI`, `MUL` or empty
    pub key: String,
    /// Default value text, `None` for no default
    pub default: Option<String>,
    /// Flags such as `auto_increment`
    pub extra: String,
}

impl DescribeRow {
    /// Builds a row from positional driver cells. Cells past the sixth are
    /// ignored; SQL NULL in a text field reads as an empty string.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        if values.len() < 6 {
            return Err(ShimError::validation(format!(
                "Describe row has {} fields, expected 6",
                values.len()
            )));
        }
        let text = |i: usize| {
            values[i]
                .as_text()
                .map(|s| s.into_owned())
                .unwrap_or_default()
        };

        Ok(Self {
            field: text(0),
            type_text: text(1),
            null: text(2),
            key: text(3),
            default: values[4].as_text().map(|s| s.into_owned()),
            extra: text(5),
        })
    }
}

/// Type information extracted from a column type text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedType {
    /// Lowercase base type name
    pub data_type: String,
    /// Declared length of character and binary types
    pub length: Option<u32>,
    /// Total digits of fixed and floating point types
    pub precision: Option<u32>,
    /// Digits after the decimal point
    pub scale: Option<u32>,
    /// Whether the type text carries `unsigned`
    pub unsigned: bool,
}

type Extract = fn(&Captures<'_>, &mut ParsedType);

struct TypeRule {
    pattern: Regex,
    extract: Extract,
}

fn number(captures: &Captures<'_>, group: usize) -> Option<u32> {
    captures.get(group).and_then(|m| m.as_str().parse().ok())
}

fn type_rules() -> &'static [TypeRule] {
    static RULES: OnceLock<Vec<TypeRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let table: [(&str, Extract); 4] = [
            (r"(?i)^((?:var)?char)\((\d+)\)", |c: &Captures<'_>, t: &mut ParsedType| {
                t.data_type = c[1].to_string();
                t.length = number(c, 2);
            }),
            (r"(?i)^decimal\((\d+),(\d+)\)", |c: &Captures<'_>, t: &mut ParsedType| {
                t.data_type = "decimal".to_string();
                t.precision = number(c, 1);
                t.scale = number(c, 2);
            }),
            (r"(?i)^float\((\d+),(\d+)\)", |c: &Captures<'_>, t: &mut ParsedType| {
                t.data_type = "float".to_string();
                t.precision = number(c, 1);
                t.scale = number(c, 2);
            }),
            // The parenthesized width on integers is a display hint only.
            (r"(?i)^((?:big|medium|small|tiny)?int)\((\d+)\)", |c: &Captures<'_>, t: &mut ParsedType| {
                t.data_type = c[1].to_string();
            }),
        ];
        table
            .into_iter()
            .map(|(pattern, extract)| TypeRule {
                pattern: Regex::new(pattern).expect("Invalid column type pattern"),
                extract,
            })
            .collect()
    })
}

fn unsigned_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)unsigned").expect("Invalid unsigned pattern"))
}

/// Parses a column type text such as `decimal(10,2)` or `int(11) unsigned`.
///
/// # Example
/// ```rust
/// use dbshim_core::adapter::describe::parse_type;
///
/// let parsed = parse_type("varchar(255)");
/// assert_eq!(parsed.data_type, "varchar");
/// assert_eq!(parsed.length, Some(255));
/// ```
pub fn parse_type(type_text: &str) -> ParsedType {
    let mut parsed = ParsedType {
        data_type: type_text.to_string(),
        unsigned: unsigned_pattern().is_match(type_text),
        ..ParsedType::default()
    };

    if let Some((rule, captures)) = type_rules()
        .iter()
        .find_map(|rule| rule.pattern.captures(type_text).map(|c| (rule, c)))
    {
        (rule.extract)(&captures, &mut parsed);
    }

    parsed
}

/// Turns one describe row into a column descriptor.
///
/// `position` is the 1-based position of the row in the result;
/// `primary_counter` is the running primary-key ordinal shared by all rows
/// of one table and is advanced only for primary-key columns.
pub fn parse_describe_row(
    row: &DescribeRow,
    schema: Option<&str>,
    table: &str,
    folding: CaseFolding,
    position: u32,
    primary_counter: &mut u32,
) -> ColumnDescriptor {
    let parsed = parse_type(&row.type_text);

    let (primary, primary_position, identity) = if row.key.eq_ignore_ascii_case("PRI") {
        *primary_counter += 1;
        (true, Some(*primary_counter), row.extra == "auto_increment")
    } else {
        (false, None, false)
    };

    ColumnDescriptor {
        schema_name: schema.map(str::to_string),
        table_name: folding.apply(table),
        column_name: folding.apply(&row.field),
        column_position: position,
        data_type: parsed.data_type,
        default: row.default.clone(),
        nullable: row.null == "YES",
        length: parsed.length,
        scale: parsed.scale,
        precision: parsed.precision,
        unsigned: parsed.unsigned,
        primary,
        primary_position,
        identity,
    }
}
