//! Synthetic data provider for offline runs and tests.
//!
//! Produces a deterministic random walk from a starting price of 100.0,
//! seeded from the symbol name, so the same symbol and range always yield
//! the same bars.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, Interval, RawBar};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    unlisted: HashSet<String>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `symbol` as unknown to the source (answers `SymbolNotFound`).
    pub fn without(mut self, symbol: &str) -> Self {
        self.unlisted.insert(symbol.to_string());
        self
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError> {
        if self.unlisted.contains(symbol) {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars: generate_bars(symbol, start, end, interval),
            source: DataSource::Synthetic,
        })
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Session dates for an interval: weekdays, every 7th day from the first
/// weekday, or the first weekday of each month.
fn session_dates(start: NaiveDate, end: NaiveDate, interval: Interval) -> Vec<NaiveDate> {
    let weekdays = start.iter_days().take_while(|d| *d <= end).filter(|d| !is_weekend(*d));

    match interval {
        Interval::Daily => weekdays.collect(),
        Interval::Weekly => {
            let mut dates = Vec::new();
            let mut next = None;
            for d in weekdays {
                if next.map_or(true, |n| d >= n) {
                    dates.push(d);
                    next = Some(d + Duration::days(7));
                }
            }
            dates
        }
        Interval::Monthly => {
            let mut dates: Vec<NaiveDate> = Vec::new();
            for d in weekdays {
                let new_month = dates
                    .last()
                    .map_or(true, |last| (last.year(), last.month()) != (d.year(), d.month()));
                if new_month {
                    dates.push(d);
                }
            }
            dates
        }
    }
}

fn generate_bars(symbol: &str, start: NaiveDate, end: NaiveDate, interval: Interval) -> Vec<RawBar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut price = 100.0_f64;
    let mut bars = Vec::new();

    for date in session_dates(start, end, interval) {
        let period_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + period_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(RawBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }

    bars
}
