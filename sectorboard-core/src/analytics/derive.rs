//! Derived columns: per-instrument sequence index and period return.

use crate::domain::{Bar, HistoryRow, HistoryTable};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Running per-symbol state while walking the table in date order.
struct GroupState {
    next_index: usize,
    prev_close: f64,
}

/// Simple (non-log) return from `prev` to `close`.
///
/// A previous close of zero yields the IEEE result (inf or NaN).
pub fn simple_return(prev: f64, close: f64) -> f64 {
    (close - prev) / prev
}

/// Augment a long table with `sequence_index` and `period_return`.
///
/// Rows are stable-sorted by date first, so the result only depends on the
/// input's order among rows sharing a date. Within one symbol, the first
/// row by date gets index 0 and no return; each later row gets the next
/// index and the return versus that symbol's previous row.
pub fn derive_history(bars: &[Bar]) -> HistoryTable {
    let mut ordered: Vec<&Bar> = bars.iter().collect();
    ordered.sort_by_key(|b| b.date);

    let mut groups: HashMap<&str, GroupState> = HashMap::new();
    let mut rows = Vec::with_capacity(ordered.len());

    for bar in ordered {
        let (sequence_index, period_return) = match groups.entry(bar.symbol.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(GroupState {
                    next_index: 1,
                    prev_close: bar.close,
                });
                (0, None)
            }
            Entry::Occupied(mut slot) => {
                let state = slot.get_mut();
                let idx = state.next_index;
                let ret = simple_return(state.prev_close, bar.close);
                state.next_index += 1;
                state.prev_close = bar.close;
                (idx, Some(ret))
            }
        };
        rows.push(HistoryRow::from_bar(bar.clone(), sequence_index, period_return));
    }

    HistoryTable::from_sorted_rows(rows)
}
