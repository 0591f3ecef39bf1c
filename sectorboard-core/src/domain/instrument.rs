use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest display name kept for an instrument, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 30;

/// Static reference data for one configured instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl Instrument {
    /// Build an instrument, validating the symbol and truncating the name.
    pub fn new(symbol: &str, display_name: &str) -> Result<Self, UniverseError> {
        let symbol = symbol.trim();
        validate_symbol(symbol)?;
        Ok(Self {
            symbol: symbol.to_string(),
            display_name: truncate_name(display_name),
        })
    }
}

fn validate_symbol(symbol: &str) -> Result<(), UniverseError> {
    if symbol.is_empty() {
        return Err(UniverseError::EmptySymbol);
    }
    if symbol.chars().any(|c| c.is_whitespace() || c.is_lowercase()) {
        return Err(UniverseError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

fn truncate_name(name: &str) -> String {
    name.trim().chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UniverseError {
    #[error("instrument symbol must not be empty")]
    EmptySymbol,

    #[error("instrument symbol '{0}' must be an uppercase ticker without whitespace")]
    InvalidSymbol(String),

    #[error("instrument symbol '{0}' is configured more than once")]
    DuplicateSymbol(String),
}
