//! Range-filtered retrieval of one instrument's history for charting.

use crate::domain::{HistoryRow, HistoryTable};
use chrono::NaiveDate;
use serde::Serialize;

/// One instrument's rows inside a date window, date ascending.
///
/// `sequence_index` values are the ones from the full history, so a window
/// that skips bars shows the gap in the index rather than renumbering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub symbol: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<HistoryRow>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn sequence_indices(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.sequence_index).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }
}

/// Borrowing variant: rows of `symbol` with `from <= date <= to`.
///
/// Unknown symbols, windows with no rows, and `from > to` all give an
/// empty result.
pub fn select_range<'a>(
    history: &'a HistoryTable,
    symbol: &'a str,
    from: NaiveDate,
    to: NaiveDate,
) -> impl Iterator<Item = &'a HistoryRow> + 'a {
    history
        .symbol_rows(symbol)
        .skip_while(move |r| r.date < from)
        .take_while(move |r| r.date <= to)
}

/// Owned chart series for `symbol` over the inclusive window.
pub fn chart_series(history: &HistoryTable, symbol: &str, from: NaiveDate, to: NaiveDate) -> ChartSeries {
    ChartSeries {
        symbol: symbol.to_string(),
        from,
        to,
        rows: select_range(history, symbol, from, to).cloned().collect(),
    }
}
