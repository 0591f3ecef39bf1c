//! Bar: one trading day's OHLCV observation for one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol on a single date, in the long table.
///
/// Prices are carried exactly as the upstream source delivered them. The
/// `low <= open, close <= high` relationship is assumed, never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if every price field is a finite number.
    pub fn has_finite_prices(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }

    /// Basic OHLC sanity check: high >= low, open and close inside the range.
    ///
    /// Diagnostic only. Insane bars still flow through the pipeline untouched.
    pub fn is_sane(&self) -> bool {
        if !self.has_finite_prices() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
