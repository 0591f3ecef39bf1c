//! Derived-column engine, snapshot extraction, and chart retrieval.
//!
//! Everything here is pure: tables in, tables out.

pub mod derive;
pub mod range;
pub mod snapshot;

pub use derive::{derive_history, simple_return};
pub use range::{chart_series, select_range, ChartSeries};
pub use snapshot::build_snapshot;

use crate::data::universe::Universe;
use crate::domain::{Bar, HistoryTable, SnapshotTable};

/// The History and Snapshot tables of one derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTables {
    pub history: HistoryTable,
    pub snapshot: SnapshotTable,
}

/// Run the derived-column engine over a raw long table.
pub fn derive_tables(bars: &[Bar], universe: &Universe) -> DerivedTables {
    let history = derive_history(bars);
    let snapshot = build_snapshot(&history, universe);
    DerivedTables { history, snapshot }
}
