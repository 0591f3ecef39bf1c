//! Domain types for SectorBoard

pub mod bar;
pub mod history;
pub mod instrument;
pub mod range;
pub mod snapshot;

pub use bar::Bar;
pub use history::{HistoryRow, HistoryTable};
pub use instrument::{Instrument, UniverseError, MAX_DISPLAY_NAME_CHARS};
pub use range::{DateRange, RangeError};
pub use snapshot::{SnapshotRow, SnapshotTable};

