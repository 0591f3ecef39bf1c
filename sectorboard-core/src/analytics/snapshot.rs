//! Snapshot extraction: latest global date, joined with instrument metadata.

use crate::data::universe::Universe;
use crate::domain::{HistoryRow, HistoryTable, SnapshotRow, SnapshotTable};
use std::collections::HashMap;

/// Build the snapshot for the single latest date in the whole history.
///
/// The as-of date is global, not per instrument: an instrument whose last
/// bar is older than the global latest date is left out.
pub fn build_snapshot(history: &HistoryTable, universe: &Universe) -> SnapshotTable {
    let Some(as_of) = history.max_date() else {
        return SnapshotTable::default();
    };

    let latest: HashMap<&str, &HistoryRow> =
        history.rows_on(as_of).map(|r| (r.symbol.as_str(), r)).collect();

    let rows = universe
        .instruments()
        .iter()
        .filter_map(|inst| latest.get(inst.symbol.as_str()).map(|row| SnapshotRow::join(inst, row)))
        .collect();

    SnapshotTable {
        as_of: Some(as_of),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::derive::derive_history;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn bar(symbol: &str, day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            symbol: symbol.into(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10,
        }
    }

    fn universe() -> Universe {
        Universe::from_pairs(&[("SPY", "S&P 500"), ("AAPL", "Apple"), ("QQQ", "Nasdaq")]).unwrap()
    }

    #[test]
    fn snapshot_follows_config_order_and_joins_names() {
        let history = derive_history(&[
            bar("QQQ", 4, 300.0),
            bar("AAPL", 4, 100.0),
            bar("QQQ", 5, 303.0),
            bar("AAPL", 5, 102.0),
        ]);
        let snap = build_snapshot(&history, &universe());

        assert_eq!(snap.as_of, NaiveDate::from_ymd_opt(2021, 1, 5));
        let symbols: Vec<&str> = snap.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "QQQ"]);
        assert_eq!(snap.rows[0].display_name, "Apple");
        assert!((snap.rows[0].period_return.unwrap() - 0.02).abs() < 1e-12);
        assert_eq!(snap.rows[1].sequence_index, 1);
    }

    #[test]
    fn instrument_with_older_last_bar_is_dropped() {
        let history = derive_history(&[bar("SPY", 4, 1.0), bar("AAPL", 4, 1.0), bar("AAPL", 6, 1.0)]);
        let snap = build_snapshot(&history, &universe());
        assert_eq!(snap.len(), 1);
        assert!(snap.get("SPY").is_none());
        assert!(snap.get("AAPL").is_some());
    }

    #[test]
    fn unconfigured_symbol_never_reaches_snapshot() {
        let history = derive_history(&[bar("TSLA", 4, 1.0), bar("SPY", 4, 1.0)]);
        let snap = build_snapshot(&history, &universe());
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.rows[0].symbol, "SPY");
    }

    #[test]
    fn first_bar_on_as_of_date_has_no_return() {
        let history = derive_history(&[bar("SPY", 4, 1.0)]);
        let snap = build_snapshot(&history, &universe());
        assert_eq!(snap.rows[0].period_return, None);
    }

    #[test]
    fn empty_history_gives_empty_snapshot() {
        let snap = build_snapshot(&HistoryTable::default(), &universe());
        assert!(snap.is_empty());
        assert_eq!(snap.as_of, None);
    }
}
