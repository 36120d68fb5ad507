//! Adapter configuration.
//!
//! Holds the legacy adapter options that change shim behavior: the default
//! fetch mode handed to new statements, the identifier case-folding policy
//! applied to introspected names, and whether identifiers are quoted.

use crate::error::ShimError;
use crate::fetch::FetchMode;
use crate::models::CaseFolding;
use serde::{Deserialize, Serialize};

/// Configuration for one adapter instance.
///
/// # Example
/// ```rust
/// use dbshim_core::adapter::AdapterConfig;
/// use dbshim_core::{CaseFolding, FetchMode};
///
/// let config = AdapterConfig::default()
///     .with_fetch_mode(FetchMode::Num)
///     .with_case_folding(CaseFolding::Lower);
///
/// assert_eq!(config.fetch_mode, FetchMode::Num);
/// assert!(config.auto_quote_identifiers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Fetch style used when a fetch call names none
    pub fetch_mode: FetchMode,
    /// Folding applied to table and column names from introspection
    pub case_folding: CaseFolding,
    /// Whether `quote_identifier` wraps identifiers in quote symbols
    pub auto_quote_identifiers: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            fetch_mode: FetchMode::Assoc,
            case_folding: CaseFolding::Natural,
            auto_quote_identifiers: true,
        }
    }
}

impl std::fmt::Display for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AdapterConfig(fetch_mode={:?}, case_folding={:?}, auto_quote_identifiers={})",
            self.fetch_mode, self.case_folding, self.auto_quote_identifiers
        )
    }
}

impl AdapterConfig {
    /// Builds a configuration from legacy option pairs.
    ///
    /// Recognized keys are `fetchMode`, `caseFolding` and
    /// `autoQuoteIdentifiers` (snake_case spellings accepted). Unknown keys
    /// are ignored; invalid values are rejected.
    pub fn from_options<I, K, V>(options: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in options {
            let value = value.as_ref();
            match key.as_ref() {
                "fetchMode" | "fetch_mode" => {
                    config.fetch_mode = value.parse().map_err(|e: ShimError| {
                        ShimError::configuration(format!("Invalid fetchMode option: {}", e))
                    })?;
                }
                "caseFolding" | "case_folding" => {
                    config.case_folding = value.parse()?;
                }
                "autoQuoteIdentifiers" | "auto_quote_identifiers" => {
                    config.auto_quote_identifiers = parse_flag(value)?;
                }
                _ => {} // Ignore other options
            }
        }

        Ok(config)
    }

    /// Builder method to set the default fetch mode.
    pub fn with_fetch_mode(mut self, fetch_mode: FetchMode) -> Self {
        self.fetch_mode = fetch_mode;
        self
    }

    /// Builder method to set the case-folding policy.
    pub fn with_case_folding(mut self, case_folding: CaseFolding) -> Self {
        self.case_folding = case_folding;
        self
    }

    /// Builder method to toggle identifier quoting.
    pub fn with_auto_quote_identifiers(mut self, enabled: bool) -> Self {
        self.auto_quote_identifiers = enabled;
        self
    }
}

fn parse_flag(value: &str) -> crate::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ShimError::configuration(format!(
            "Invalid boolean option value '{}'",
            other
        ))),
    }
}
