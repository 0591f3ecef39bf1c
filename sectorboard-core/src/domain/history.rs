//! History table: the long-format, per-instrument augmented bar set.

use super::bar::Bar;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// A bar augmented with its per-instrument derived columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub symbol: String,
    /// Zero-based position of this bar within its instrument's history.
    pub sequence_index: usize,
    /// Simple close-to-close return versus the instrument's previous bar.
    /// `None` on the instrument's first bar.
    pub period_return: Option<f64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl HistoryRow {
    pub fn from_bar(bar: Bar, sequence_index: usize, period_return: Option<f64>) -> Self {
        Self {
            date: bar.date,
            symbol: bar.symbol,
            sequence_index,
            period_return,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// All augmented rows of one refresh, ordered by date ascending.
///
/// Keeps a per-symbol index so single-instrument reads do not scan the
/// whole table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryTable {
    rows: Vec<HistoryRow>,
    #[serde(skip)]
    by_symbol: HashMap<String, Vec<usize>>,
}

impl HistoryTable {
    /// Build a table from rows already sorted by date ascending.
    pub(crate) fn from_sorted_rows(rows: Vec<HistoryRow>) -> Self {
        let mut by_symbol: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            by_symbol.entry(row.symbol.clone()).or_default().push(i);
        }
        Self { rows, by_symbol }
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The latest date present anywhere in the table, across all instruments.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).max()
    }

    /// Rows dated exactly `date`, in table order.
    pub fn rows_on(&self, date: NaiveDate) -> impl Iterator<Item = &HistoryRow> {
        self.rows.iter().filter(move |r| r.date == date)
    }

    /// All rows of one instrument, date ascending. Empty for unknown symbols.
    pub fn symbol_rows(&self, symbol: &str) -> impl Iterator<Item = &HistoryRow> {
        self.by_symbol
            .get(symbol)
            .map(|v| v.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&i| &self.rows[i])
    }

    /// Number of rows held for a symbol.
    pub fn symbol_len(&self, symbol: &str) -> usize {
        self.by_symbol.get(symbol).map_or(0, Vec::len)
    }

    /// Distinct symbols present, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.by_symbol.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, day: u32, seq: usize) -> HistoryRow {
        HistoryRow {
            date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            symbol: symbol.into(),
            sequence_index: seq,
            period_return: None,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0,
        }
    }

    #[test]
    fn symbol_index_follows_table_order() {
        let table = HistoryTable::from_sorted_rows(vec![
            row("SPY", 4, 0),
            row("QQQ", 4, 0),
            row("SPY", 5, 1),
        ]);

        let spy: Vec<usize> = table.symbol_rows("SPY").map(|r| r.sequence_index).collect();
        assert_eq!(spy, vec![0, 1]);
        assert_eq!(table.symbol_len("QQQ"), 1);
        assert_eq!(table.symbol_rows("DIA").count(), 0);
        assert_eq!(table.symbols(), vec!["QQQ", "SPY"]);
    }

    #[test]
    fn max_date_spans_all_symbols() {
        let table = HistoryTable::from_sorted_rows(vec![row("SPY", 4, 0), row("QQQ", 6, 0)]);
        assert_eq!(table.max_date(), NaiveDate::from_ymd_opt(2021, 1, 6));
        assert_eq!(HistoryTable::default().max_date(), None);
    }
}
