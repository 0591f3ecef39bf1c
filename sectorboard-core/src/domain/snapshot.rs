//! Snapshot table: one row per instrument on the single global as-of date.

use super::history::HistoryRow;
use super::instrument::Instrument;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub symbol: String,
    pub display_name: String,
    pub date: NaiveDate,
    pub sequence_index: usize,
    pub period_return: Option<f64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl SnapshotRow {
    pub fn join(instrument: &Instrument, row: &HistoryRow) -> Self {
        Self {
            symbol: instrument.symbol.clone(),
            display_name: instrument.display_name.clone(),
            date: row.date,
            sequence_index: row.sequence_index,
            period_return: row.period_return,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

/// Snapshot rows in instrument configuration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotTable {
    /// Latest date across the whole history table; `None` when it was empty.
    pub as_of: Option<NaiveDate>,
    pub rows: Vec<SnapshotRow>,
}

impl SnapshotTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&SnapshotRow> {
        self.rows.iter().find(|r| r.symbol == symbol)
    }
}
