//! Serializable board configuration (TOML).
//!
//! ```toml
//! [range]
//! start = "2015-01-01"
//! end = "2020-12-31"
//!
//! [fetch]
//! interval = "1d"
//! timeout_secs = 120
//!
//! [provider]
//! kind = "yahoo"
//!
//! [[instruments]]
//! symbol = "SPY"
//! name = "S&P 500"
//! ```
//!
//! Every section is optional; omitted sections take the defaults of the
//! original sector dashboard.

use crate::data::circuit_breaker::CircuitBreaker;
use crate::data::provider::{DataError, DataProvider, Interval};
use crate::data::synthetic::SyntheticProvider;
use crate::data::universe::Universe;
use crate::data::yahoo::{YahooProvider, YahooSettings};
use crate::domain::{DateRange, Instrument, RangeError, UniverseError};
use crate::pipeline::PipelineSettings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid instruments: {0}")]
    Universe(#[from] UniverseError),

    #[error("invalid range: {0}")]
    Range(#[from] RangeError),

    #[error("provider setup: {0}")]
    Provider(#[from] DataError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub interval: Interval,
    /// Upper bound on one refresh's provider call, in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            interval: Interval::Daily,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Yahoo,
            request_timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
        }
    }
}

/// Full board configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorboardConfig {
    #[serde(default = "default_range")]
    pub range: DateRange,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default = "default_instruments")]
    pub instruments: Vec<Instrument>,
}

fn default_range() -> DateRange {
    // The original dashboard's fixed download window.
    DateRange::new(
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
        NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or_default(),
    )
    .unwrap_or_else(|_| unreachable!("static default range is ordered"))
}

fn default_instruments() -> Vec<Instrument> {
    Universe::default_etfs().instruments().to_vec()
}

impl Default for SectorboardConfig {
    fn default() -> Self {
        Self {
            range: default_range(),
            fetch: FetchConfig::default(),
            provider: ProviderConfig::default(),
            instruments: default_instruments(),
        }
    }
}

impl SectorboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate (the instrument list is checked eagerly).
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.universe()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The validated instrument list.
    pub fn universe(&self) -> Result<Universe, ConfigError> {
        Ok(Universe::new(self.instruments.iter().cloned())?)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            range: self.range,
            interval: self.fetch.interval,
            fetch_timeout: Duration::from_secs(self.fetch.timeout_secs),
        }
    }

    /// Build the configured market-data provider.
    pub fn build_provider(&self) -> Result<Arc<dyn DataProvider>, ConfigError> {
        let p = &self.provider;
        match p.kind {
            ProviderKind::Synthetic => Ok(Arc::new(SyntheticProvider::new())),
            ProviderKind::Yahoo => {
                let breaker = Arc::new(CircuitBreaker::new(
                    Duration::from_secs(p.breaker_cooldown_secs),
                    p.breaker_failure_threshold,
                ));
                let settings = YahooSettings {
                    request_timeout: Duration::from_secs(p.request_timeout_secs),
                    max_retries: p.max_retries,
                    base_delay: Duration::from_millis(p.base_delay_ms),
                };
                Ok(Arc::new(YahooProvider::new(settings, breaker)?))
            }
        }
    }
}
