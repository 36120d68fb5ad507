//! Placeholder rewriting and literal escaping for MySQL.
//!
//! The server only understands `?` markers, so `:name` placeholders are
//! rewritten to `?` and remembered in slot order. Text inside quoted
//! literals, backtick identifiers and comments is copied untouched.

use crate::error::{DriverError, DriverResult};
use crate::models::{ParamKey, Params, Value};
use std::collections::HashMap;

/// Placeholder layout of a rewritten statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholders {
    /// `count` positional `?` markers
    Positional(usize),
    /// One entry per marker, in order; a name may repeat
    Named(Vec<String>),
}

impl Placeholders {
    /// Whether `key` addresses a marker of this statement.
    pub fn accepts(&self, key: &ParamKey) -> bool {
        match (self, key) {
            (Self::Positional(count), ParamKey::Position(p)) => (1..=*count).contains(p),
            (Self::Named(names), ParamKey::Name(name)) => names.iter().any(|n| n == name),
            _ => false,
        }
    }

    /// Values for each marker, taking `params` over `bound`.
    ///
    /// # Errors
    /// `HY093` when a marker has no value.
    pub fn resolve(
        &self,
        bound: &HashMap<ParamKey, Value>,
        params: Option<&Params>,
    ) -> DriverResult<Vec<Value>> {
        let overrides: HashMap<ParamKey, &Value> = params
            .into_iter()
            .flatten()
            .map(|(key, value)| (key.clone().normalized(), value))
            .collect();

        let keys: Vec<ParamKey> = match self {
            Self::Positional(count) => (1..=*count).map(ParamKey::Position).collect(),
            Self::Named(names) => names.iter().map(|n| ParamKey::Name(n.clone())).collect(),
        };

        keys.into_iter()
            .map(|key| {
                overrides
                    .get(&key)
                    .map(|v| (*v).clone())
                    .or_else(|| bound.get(&key).cloned())
                    .ok_or_else(|| {
                        DriverError::invalid_parameter(format!("Parameter {} was not bound", key))
                    })
            })
            .collect()
    }
}

/// Rewrites `:name` markers to `?`.
///
/// # Errors
/// `HY093` when named and positional markers are mixed.
///
/// # Example
/// ```rust
/// use dbshim_core::drivers::mysql::placeholders::{Placeholders, rewrite};
///
/// let (sql, layout) = rewrite("SELECT ':skip' FROM t WHERE id = :id").unwrap();
/// assert_eq!(sql, "SELECT ':skip' FROM t WHERE id = ?");
/// assert_eq!(layout, Placeholders::Named(vec![":id".to_string()]));
/// ```
pub fn rewrite(sql: &str) -> DriverResult<(String, Placeholders)> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut names = Vec::new();
    let mut positional = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                let end = skip_quoted(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            // `--` opens a comment only when followed by whitespace or a control character
            '-' if chars.get(i + 1) == Some(&'-')
                && chars
                    .get(i + 2)
                    .is_none_or(|n| n.is_whitespace() || n.is_control()) =>
            {
                let end = skip_line(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '#' => {
                let end = skip_line(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = skip_block_comment(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '?' => {
                positional += 1;
                out.push('?');
                i += 1;
            }
            // `::` is never a placeholder
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|n| is_name_char(*n)) => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|n| !is_name_char(*n))
                    .map_or(chars.len(), |p| start + p);
                let name: String = chars[start..end].iter().collect();
                names.push(format!(":{}", name));
                out.push('?');
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    match (positional, names.is_empty()) {
        (0, _) if !names.is_empty() => Ok((out, Placeholders::Named(names))),
        (count, true) => Ok((out, Placeholders::Positional(count))),
        _ => Err(DriverError::invalid_parameter(
            "Invalid parameter number: mixed named and positional parameters",
        )),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn skip_quoted(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if quote != '`' => i += 2,
            c if c == quote => {
                // Doubled quote is an escaped quote
                if chars.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    chars.len()
}

fn skip_line(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|c| *c == '\n')
        .map_or(chars.len(), |p| start + p)
}

fn skip_block_comment(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// Escapes a string the way `mysql_real_escape_string` does and wraps it in
/// single quotes.
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\0' => quoted.push_str("\\0"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\x1a' => quoted.push_str("\\Z"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}
