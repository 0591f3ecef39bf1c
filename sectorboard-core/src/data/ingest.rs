//! Ingestion & reshape: per-symbol provider results into one long table.
//!
//! The long table has one row per `(date, symbol)` that the source actually
//! delivered. There is no rectangular grid and no padding: an instrument
//! with no bars simply contributes no rows.

use super::provider::{DataError, DataProvider, FetchResult, Interval, RawBar};
use super::universe::Universe;
use crate::domain::{Bar, DateRange};
use crate::error::PipelineError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// A provider row that was dropped because it failed basic shape checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub reason: String,
}

/// What happened to each requested symbol during one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub requested: usize,
    /// Symbols that contributed at least one row.
    pub symbols_with_data: Vec<String>,
    /// Symbols the source knows nothing about, or that had no bars in range.
    pub empty_symbols: Vec<String>,
    /// Symbols whose fetch failed, with the error text.
    pub failed_symbols: Vec<(String, String)>,
    pub malformed: Vec<MalformedBar>,
    pub out_of_range_dropped: usize,
    pub duplicates_dropped: usize,
    /// Rows in the reshaped long table.
    pub rows: usize,
}

impl IngestReport {
    /// The source answered but had nothing for the whole instrument set.
    pub fn is_empty_result(&self) -> bool {
        self.rows == 0
    }
}

/// The reshaped long table plus its ingestion report.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    /// Sorted by date ascending, then instrument configuration order.
    pub bars: Vec<Bar>,
    pub report: IngestReport,
}

/// Fetch every instrument of the universe and reshape the results.
pub fn ingest(
    provider: &dyn DataProvider,
    universe: &Universe,
    range: DateRange,
    interval: Interval,
) -> Result<Ingested, PipelineError> {
    let symbols = universe.symbols();
    tracing::info!(
        provider = provider.name(),
        symbols = symbols.len(),
        %range,
        %interval,
        "ingesting bars"
    );
    let outcomes = provider.fetch_many(&symbols, range.start(), range.end(), interval);
    reshape(universe, range, outcomes)
}

/// Reshape per-symbol fetch outcomes into the long table.
///
/// Per symbol: drop bars outside `range`, drop bars with non-finite prices
/// (recorded as malformed), then drop repeated dates keeping the first.
/// Fails with `DataSourceUnavailable` when no symbol yielded rows and either
/// every symbol failed or at least one failure was a connectivity error.
/// "Symbol not found" alone is never a failure.
pub fn reshape(
    universe: &Universe,
    range: DateRange,
    outcomes: Vec<(String, Result<FetchResult, DataError>)>,
) -> Result<Ingested, PipelineError> {
    let mut report = IngestReport {
        requested: outcomes.len(),
        ..Default::default()
    };
    let mut bars = Vec::new();
    let mut connectivity_failures = 0usize;

    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(fetched) => {
                let before = bars.len();
                reshape_symbol(&symbol, fetched.bars, range, &mut bars, &mut report);
                let rows = bars.len() - before;
                tracing::debug!(%symbol, rows, source = ?fetched.source, "symbol reshaped");
                if rows == 0 {
                    report.empty_symbols.push(symbol);
                } else {
                    report.symbols_with_data.push(symbol);
                }
            }
            Err(DataError::SymbolNotFound { .. }) => {
                tracing::info!(%symbol, "no data for symbol");
                report.empty_symbols.push(symbol);
            }
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "fetch failed");
                if e.is_connectivity() {
                    connectivity_failures += 1;
                }
                report.failed_symbols.push((symbol, e.to_string()));
            }
        }
    }

    let all_failed = report.requested > 0 && report.failed_symbols.len() == report.requested;
    if bars.is_empty() && (all_failed || connectivity_failures > 0) {
        let (symbol, reason) = &report.failed_symbols[0];
        return Err(PipelineError::DataSourceUnavailable(format!(
            "{} of {} symbols failed and none returned data (first: {symbol}: {reason})",
            report.failed_symbols.len(),
            report.requested
        )));
    }

    bars.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| config_rank(universe, &a.symbol).cmp(&config_rank(universe, &b.symbol)))
    });
    report.rows = bars.len();

    if report.is_empty_result() {
        tracing::warn!(requested = report.requested, "source returned no bars for any instrument");
    }

    Ok(Ingested { bars, report })
}

/// Sort key placing configured symbols first in configuration order.
fn config_rank<'a>(universe: &Universe, symbol: &'a str) -> (usize, &'a str) {
    (universe.position(symbol).unwrap_or(usize::MAX), symbol)
}

fn reshape_symbol(
    symbol: &str,
    raw: Vec<RawBar>,
    range: DateRange,
    out: &mut Vec<Bar>,
    report: &mut IngestReport,
) {
    let mut seen: HashSet<NaiveDate> = HashSet::with_capacity(raw.len());

    for raw_bar in raw {
        if !range.contains(raw_bar.date) {
            report.out_of_range_dropped += 1;
            continue;
        }

        if let Some(reason) = malformed_reason(&raw_bar) {
            tracing::warn!(%symbol, date = %raw_bar.date, %reason, "dropping malformed bar");
            report.malformed.push(MalformedBar {
                symbol: symbol.to_string(),
                date: raw_bar.date,
                reason,
            });
            continue;
        }

        if !seen.insert(raw_bar.date) {
            report.duplicates_dropped += 1;
            continue;
        }

        let bar = Bar {
            date: raw_bar.date,
            symbol: symbol.to_string(),
            open: raw_bar.open,
            high: raw_bar.high,
            low: raw_bar.low,
            close: raw_bar.close,
            volume: raw_bar.volume,
        };
        if !bar.is_sane() {
            // Kept as delivered.
            tracing::debug!(%symbol, date = %bar.date, "bar outside its own high/low range");
        }
        out.push(bar);
    }
}

fn malformed_reason(bar: &RawBar) -> Option<String> {
    let bad: Vec<&str> = [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ]
    .into_iter()
    .filter(|(_, v)| !v.is_finite())
    .map(|(name, _)| name)
    .collect();

    if bad.is_empty() {
        None
    } else {
        Some(format!("non-numeric {}", bad.join(", ")))
    }
}
