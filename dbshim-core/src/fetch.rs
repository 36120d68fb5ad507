//! Fetch styles and the row shapes they produce.
//!
//! A fetch style only changes the shape of a returned row, never its
//! content. [`FetchMode::shape`] turns the positional cells and column names
//! reported by a statement handle into the requested [`Row`] variant.

use crate::error::ShimError;
use crate::models::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Row shape requested from a fetch, with the legacy numeric codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Row object whose properties are materialized on access
    Lazy = 1,
    /// Column name to value map
    #[default]
    Assoc = 2,
    /// Positional values
    Num = 3,
    /// Addressable by column name and by position
    Both = 4,
    /// Row object with one property per column
    Obj = 5,
}

impl FetchMode {
    /// All styles the legacy contract accepts.
    pub const ALL: [Self; 5] = [Self::Lazy, Self::Assoc, Self::Num, Self::Both, Self::Obj];

    /// Legacy numeric code.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Builds a row of this shape from column names and positional cells.
    pub fn shape(self, columns: &[String], values: Vec<Value>) -> Row {
        match self {
            Self::Num => Row::Num(values),
            Self::Assoc => Row::Assoc(named(columns, values)),
            Self::Both => Row::Both(BothRow {
                columns: columns.to_vec(),
                values,
            }),
            Self::Obj => Row::Obj(RowObject {
                properties: named(columns, values),
            }),
            Self::Lazy => Row::Lazy(RowObject {
                properties: named(columns, values),
            }),
        }
    }
}

// Duplicate column names keep the last value, as the legacy associative
// fetch does.
fn named(columns: &[String], values: Vec<Value>) -> IndexMap<String, Value> {
    columns.iter().cloned().zip(values).collect()
}

impl TryFrom<i32> for FetchMode {
    type Error = ShimError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or_else(|| ShimError::validation(format!("Invalid fetch mode '{}' specified", code)))
    }
}

impl std::str::FromStr for FetchMode {
    type Err = ShimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lazy" => Ok(Self::Lazy),
            "assoc" => Ok(Self::Assoc),
            "num" => Ok(Self::Num),
            "both" => Ok(Self::Both),
            "obj" | "object" => Ok(Self::Obj),
            other => other
                .parse::<i32>()
                .map_err(|_| ShimError::validation(format!("Invalid fetch mode '{}' specified", s)))
                .and_then(Self::try_from),
        }
    }
}

/// Cursor orientation for a fetch. Only forward iteration is available on
/// modern statement handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorOrientation {
    #[default]
    Next = 0,
    Prior = 1,
    First = 2,
    Last = 3,
    Absolute = 4,
    Relative = 5,
}

/// A fetched row in the requested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Row {
    Assoc(IndexMap<String, Value>),
    Num(Vec<Value>),
    Both(BothRow),
    Obj(RowObject),
    Lazy(RowObject),
}

impl Row {
    /// Looks a cell up by column name. Positional rows have no names.
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self {
            Self::Assoc(map) => map.get(column),
            Self::Num(_) => None,
            Self::Both(row) => row.get(column),
            Self::Obj(object) | Self::Lazy(object) => object.get(column),
        }
    }

    /// Looks a cell up by 0-based position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Assoc(map) => map.get_index(index).map(|(_, v)| v),
            Self::Num(values) => values.get(index),
            Self::Both(row) => row.values.get(index),
            Self::Obj(object) | Self::Lazy(object) => {
                object.properties.get_index(index).map(|(_, v)| v)
            }
        }
    }

    /// Number of cells in the row.
    pub fn len(&self) -> usize {
        match self {
            Self::Assoc(map) => map.len(),
            Self::Num(values) => values.len(),
            Self::Both(row) => row.values.len(),
            Self::Obj(object) | Self::Lazy(object) => object.properties.len(),
        }
    }

    /// True for a row with no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the row, returning its cells in column order.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Assoc(map) => map.into_values().collect(),
            Self::Num(values) => values,
            Self::Both(row) => row.values,
            Self::Obj(object) | Self::Lazy(object) => object.properties.into_values().collect(),
        }
    }
}

/// Row addressable by both name and position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BothRow {
    /// Column names, one per value
    pub columns: Vec<String>,
    /// Cells in select-list order
    pub values: Vec<Value>,
}

impl BothRow {
    /// Cell for the last column carrying this name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|c| c == column)
            .and_then(|i| self.values.get(i))
    }
}

/// Row object with one property per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RowObject {
    /// Cells keyed by column name
    pub properties: IndexMap<String, Value>,
}

impl RowObject {
    /// Property value by column name.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.properties.get(property)
    }
}
