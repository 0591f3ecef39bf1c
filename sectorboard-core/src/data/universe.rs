//! Universe configuration: the ordered list of instruments on the board.
//!
//! Stored as TOML `[[instruments]]` tables with `symbol` and `name`.
//! Configuration order is significant: it is the row order of the snapshot.

use crate::domain::{Instrument, UniverseError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The original dashboard's instrument list: US index and sector ETFs.
const DEFAULT_ETFS: &[(&str, &str)] = &[
    ("SPY", "S&P 500"),
    ("QQQ", "Nasdaq"),
    ("DIA", "DowJones"),
    ("IWN", "Russell"),
    ("XLB", "Basic Materials"),
    ("XLE", "Energy"),
    ("XLF", "Financials"),
    ("XLI", "Industrials"),
    ("XLK", "Technology"),
    ("XLP", "Staples"),
    ("XLU", "Utilities"),
    ("XLY", "Discretionary"),
    ("XLV", "Health Care"),
];

/// Validated, ordered, duplicate-free instrument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UniverseFile", into = "UniverseFile")]
pub struct Universe {
    instruments: Vec<Instrument>,
    positions: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UniverseFile {
    #[serde(default)]
    instruments: Vec<Instrument>,
}

impl TryFrom<UniverseFile> for Universe {
    type Error = UniverseError;

    fn try_from(file: UniverseFile) -> Result<Self, Self::Error> {
        Self::new(file.instruments)
    }
}

impl From<Universe> for UniverseFile {
    fn from(u: Universe) -> Self {
        Self {
            instruments: u.instruments,
        }
    }
}

impl Universe {
    /// Validate and index an instrument list.
    ///
    /// Instruments that bypassed `Instrument::new` (e.g. deserialized ones)
    /// are re-validated here.
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Result<Self, UniverseError> {
        let mut validated = Vec::new();
        let mut positions = HashMap::new();

        for inst in instruments {
            let inst = Instrument::new(&inst.symbol, &inst.display_name)?;
            if positions.insert(inst.symbol.clone(), validated.len()).is_some() {
                return Err(UniverseError::DuplicateSymbol(inst.symbol));
            }
            validated.push(inst);
        }

        Ok(Self {
            instruments: validated,
            positions,
        })
    }

    /// Build from `(symbol, name)` pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, UniverseError> {
        let instruments = pairs
            .iter()
            .map(|(symbol, name)| Instrument::new(symbol, name))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(instruments)
    }

    /// US index and sector ETFs.
    pub fn default_etfs() -> Self {
        Self {
            instruments: DEFAULT_ETFS
                .iter()
                .map(|(symbol, name)| Instrument {
                    symbol: symbol.to_string(),
                    display_name: name.to_string(),
                })
                .collect(),
            positions: DEFAULT_ETFS
                .iter()
                .enumerate()
                .map(|(i, (symbol, _))| (symbol.to_string(), i))
                .collect(),
        }
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Configuration position of a symbol.
    pub fn position(&self, symbol: &str) -> Option<usize> {
        self.positions.get(symbol).copied()
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.position(symbol).map(|i| &self.instruments[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_keeps_dashboard_order() {
        let u = Universe::default_etfs();
        assert_eq!(u.len(), 13);
        assert_eq!(u.symbols()[0], "SPY");
        assert_eq!(u.symbols()[12], "XLV");
        assert_eq!(u.position("XLK"), Some(8));
        assert_eq!(u.get("XLU").unwrap().display_name, "Utilities");
    }

    #[test]
    fn default_universe_passes_validation() {
        let u = Universe::default_etfs();
        let revalidated = Universe::new(u.instruments().to_vec()).unwrap();
        assert_eq!(u, revalidated);
    }

    #[test]
    fn duplicate_symbol_rejected() {
        let err = Universe::from_pairs(&[("SPY", "a"), ("QQQ", "b"), ("SPY", "c")]).unwrap_err();
        assert_eq!(err, UniverseError::DuplicateSymbol("SPY".into()));
    }

    #[test]
    fn toml_roundtrip_preserves_order() {
        let u = Universe::from_pairs(&[("XLV", "Health Care"), ("AAPL", "Apple")]).unwrap();
        let text = toml::to_string_pretty(&u).unwrap();
        assert!(text.contains("[[instruments]]"));
        assert!(text.contains("name = \"Health Care\""));

        let parsed: Universe = toml::from_str(&text).unwrap();
        assert_eq!(parsed.symbols(), vec!["XLV", "AAPL"]);
    }

    #[test]
    fn toml_validation_runs_on_load() {
        let text = "[[instruments]]\nsymbol = \"spy\"\nname = \"lower\"\n";
        assert!(toml::from_str::<Universe>(text).is_err());

        let long = format!("[[instruments]]\nsymbol = \"SPY\"\nname = \"{}\"\n", "x".repeat(50));
        let u: Universe = toml::from_str(&long).unwrap();
        assert_eq!(u.instruments()[0].display_name.len(), 30);
    }
}
