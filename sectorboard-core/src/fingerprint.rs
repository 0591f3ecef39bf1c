//! Table fingerprints: deterministic BLAKE3 hashes of derived tables.
//!
//! Every field of every row is fed in a fixed order, floats by their exact
//! bit pattern, so two tables hash equal only if they are identical.

use crate::domain::{HistoryTable, SnapshotTable};
use chrono::NaiveDate;

fn update_date(hasher: &mut blake3::Hasher, date: NaiveDate) {
    hasher.update(date.to_string().as_bytes());
}

fn update_return(hasher: &mut blake3::Hasher, ret: Option<f64>) {
    match ret {
        None => hasher.update(&[0u8]),
        Some(v) => hasher.update(&[1u8]).update(&v.to_le_bytes()),
    };
}

fn update_symbol(hasher: &mut blake3::Hasher, symbol: &str) {
    // Length prefix keeps "AB"+"C" distinct from "A"+"BC".
    hasher.update(&(symbol.len() as u64).to_le_bytes());
    hasher.update(symbol.as_bytes());
}

pub fn history_hash(history: &HistoryTable) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"history");
    for row in history.rows() {
        update_date(&mut hasher, row.date);
        update_symbol(&mut hasher, &row.symbol);
        hasher.update(&(row.sequence_index as u64).to_le_bytes());
        update_return(&mut hasher, row.period_return);
        hasher.update(&row.open.to_le_bytes());
        hasher.update(&row.high.to_le_bytes());
        hasher.update(&row.low.to_le_bytes());
        hasher.update(&row.close.to_le_bytes());
        hasher.update(&row.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

pub fn snapshot_hash(snapshot: &SnapshotTable) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"snapshot");
    if let Some(as_of) = snapshot.as_of {
        update_date(&mut hasher, as_of);
    }
    for row in &snapshot.rows {
        update_symbol(&mut hasher, &row.symbol);
        update_symbol(&mut hasher, &row.display_name);
        update_date(&mut hasher, row.date);
        hasher.update(&(row.sequence_index as u64).to_le_bytes());
        update_return(&mut hasher, row.period_return);
        hasher.update(&row.open.to_le_bytes());
        hasher.update(&row.high.to_le_bytes());
        hasher.update(&row.low.to_le_bytes());
        hasher.update(&row.close.to_le_bytes());
        hasher.update(&row.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Combined hash identifying one (History, Snapshot) pair.
pub fn dataset_hash(history: &HistoryTable, snapshot: &SnapshotTable) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(history_hash(history).as_bytes());
    hasher.update(snapshot_hash(snapshot).as_bytes());
    hasher.finalize().to_hex().to_string()
}
