//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over market-data sources (Yahoo Finance,
//! the synthetic generator, in-memory fixtures) so the pipeline can swap
//! implementations and mock them in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raw OHLCV bar from a data provider, before reshaping.
///
/// Missing prices are NaN; the reshape step decides what to do with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Bar interval requested from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    #[serde(alias = "1d")]
    Daily,
    #[serde(alias = "1wk")]
    Weekly,
    #[serde(alias = "1mo")]
    Monthly,
}

impl Interval {
    /// Interval code understood by the Yahoo chart API.
    pub fn yahoo_code(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.yahoo_code())
    }
}

/// Structured error types for data operations.
///
/// These are designed to be displayable in both CLI and log contexts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("provider did not answer within {secs}s")]
    Timeout { secs: u64 },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// True for failures that say the provider itself could not be reached,
    /// as opposed to a problem with one symbol's data.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::CircuitBreakerTripped
                | DataError::Timeout { .. }
        )
    }
}

/// Result of a successful data fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Synthetic,
    InMemory,
}

/// Trait for data providers (Yahoo Finance, synthetic, etc).
///
/// Implementations handle the specifics of fetching data from a particular
/// source. They are shared with the pipeline's fetch thread, hence
/// `Send + Sync`.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch OHLCV bars for one symbol over an inclusive date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch a batch of symbols, one outcome per requested symbol in order.
    ///
    /// Stops issuing requests once the provider reports itself unavailable;
    /// the remaining symbols get `CircuitBreakerTripped`.
    fn fetch_many(
        &self,
        symbols: &[&str],
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Vec<(String, Result<FetchResult, DataError>)> {
        let mut outcomes = Vec::with_capacity(symbols.len());

        for (i, symbol) in symbols.iter().enumerate() {
            tracing::debug!(provider = self.name(), %symbol, index = i, total = symbols.len(), "fetching");
            outcomes.push((symbol.to_string(), self.fetch(symbol, start, end, interval)));

            if !self.is_available() {
                for sym in &symbols[(i + 1)..] {
                    outcomes.push((sym.to_string(), Err(DataError::CircuitBreakerTripped)));
                }
                break;
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one flat bar per symbol and goes unavailable after `budget` calls.
    struct Budgeted {
        budget: usize,
        calls: AtomicUsize,
    }

    impl DataProvider for Budgeted {
        fn name(&self) -> &str {
            "budgeted"
        }

        fn fetch(
            &self,
            symbol: &str,
            start: NaiveDate,
            _end: NaiveDate,
            _interval: Interval,
        ) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResult {
                symbol: symbol.to_string(),
                bars: vec![RawBar {
                    date: start,
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 1,
                }],
                source: DataSource::InMemory,
            })
        }

        fn is_available(&self) -> bool {
            self.calls.load(Ordering::SeqCst) < self.budget
        }
    }

    #[test]
    fn fetch_many_keeps_request_order() {
        let p = Budgeted { budget: 10, calls: AtomicUsize::new(0) };
        let d = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let out = p.fetch_many(&["SPY", "QQQ", "DIA"], d, d, Interval::Daily);
        let symbols: Vec<&str> = out.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["SPY", "QQQ", "DIA"]);
        assert!(out.iter().all(|(_, r)| r.is_ok()));
    }

    #[test]
    fn fetch_many_stops_when_provider_goes_unavailable() {
        let p = Budgeted { budget: 1, calls: AtomicUsize::new(0) };
        let d = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let out = p.fetch_many(&["SPY", "QQQ", "DIA"], d, d, Interval::Daily);

        assert_eq!(out.len(), 3);
        assert_eq!(p.calls.load(Ordering::SeqCst), 1);
        assert!(out[0].1.is_ok());
        assert_eq!(out[1].1.as_ref().unwrap_err(), &DataError::CircuitBreakerTripped);
        assert_eq!(out[2].1.as_ref().unwrap_err(), &DataError::CircuitBreakerTripped);
    }

    #[test]
    fn connectivity_classification() {
        assert!(DataError::NetworkUnreachable("x".into()).is_connectivity());
        assert!(DataError::Timeout { secs: 5 }.is_connectivity());
        assert!(!DataError::SymbolNotFound { symbol: "X".into() }.is_connectivity());
        assert!(!DataError::ResponseFormatChanged("x".into()).is_connectivity());
    }

    #[test]
    fn interval_parses_yahoo_codes() {
        #[derive(Deserialize)]
        struct Wrap {
            interval: Interval,
        }
        let w: Wrap = toml::from_str("interval = \"1d\"").unwrap();
        assert_eq!(w.interval, Interval::Daily);
        let w: Wrap = toml::from_str("interval = \"weekly\"").unwrap();
        assert_eq!(w.interval, Interval::Weekly);
        assert_eq!(Interval::Monthly.to_string(), "1mo");
    }
}
