//! Tabular (Polars) views of the History and Snapshot tables.

use crate::domain::{HistoryTable, SnapshotTable};
use chrono::NaiveDate;
use polars::prelude::*;

pub const DATE: &str = "date";
pub const SYMBOL: &str = "symbol";
pub const DISPLAY_NAME: &str = "display_name";
pub const SEQUENCE_INDEX: &str = "sequence_index";
pub const PERIOD_RETURN: &str = "period_return";
pub const OPEN: &str = "open";
pub const HIGH: &str = "high";
pub const LOW: &str = "low";
pub const CLOSE: &str = "close";
pub const VOLUME: &str = "volume";

/// Expected column layouts of the exported tables.
pub struct TableSchema;

impl TableSchema {
    pub fn history() -> Schema {
        Schema::from_iter(vec![
            Field::new(DATE.into(), DataType::Date),
            Field::new(SYMBOL.into(), DataType::String),
            Field::new(SEQUENCE_INDEX.into(), DataType::UInt64),
            Field::new(PERIOD_RETURN.into(), DataType::Float64),
            Field::new(OPEN.into(), DataType::Float64),
            Field::new(HIGH.into(), DataType::Float64),
            Field::new(LOW.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
            Field::new(VOLUME.into(), DataType::UInt64),
        ])
    }

    pub fn snapshot() -> Schema {
        Schema::from_iter(vec![
            Field::new(SYMBOL.into(), DataType::String),
            Field::new(DISPLAY_NAME.into(), DataType::String),
            Field::new(DATE.into(), DataType::Date),
            Field::new(SEQUENCE_INDEX.into(), DataType::UInt64),
            Field::new(PERIOD_RETURN.into(), DataType::Float64),
            Field::new(OPEN.into(), DataType::Float64),
            Field::new(HIGH.into(), DataType::Float64),
            Field::new(LOW.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
            Field::new(VOLUME.into(), DataType::UInt64),
        ])
    }

    /// Check that a DataFrame carries every expected column with its dtype.
    pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
        let actual = df.schema();
        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("dataframe construction failed: {0}")]
    Polars(#[from] PolarsError),
}

fn epoch_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn date_column(dates: Vec<i32>) -> Result<Column, SchemaError> {
    Ok(Column::new(DATE.into(), dates).cast(&DataType::Date)?)
}

/// History table as a DataFrame; `period_return` is null on first rows.
pub fn history_to_dataframe(history: &HistoryTable) -> Result<DataFrame, SchemaError> {
    let rows = history.rows();
    let df = DataFrame::new(vec![
        date_column(rows.iter().map(|r| epoch_days(r.date)).collect())?,
        Column::new(SYMBOL.into(), rows.iter().map(|r| r.symbol.clone()).collect::<Vec<String>>()),
        Column::new(
            SEQUENCE_INDEX.into(),
            rows.iter().map(|r| r.sequence_index as u64).collect::<Vec<u64>>(),
        ),
        Column::new(PERIOD_RETURN.into(), rows.iter().map(|r| r.period_return).collect::<Vec<Option<f64>>>()),
        Column::new(OPEN.into(), rows.iter().map(|r| r.open).collect::<Vec<f64>>()),
        Column::new(HIGH.into(), rows.iter().map(|r| r.high).collect::<Vec<f64>>()),
        Column::new(LOW.into(), rows.iter().map(|r| r.low).collect::<Vec<f64>>()),
        Column::new(CLOSE.into(), rows.iter().map(|r| r.close).collect::<Vec<f64>>()),
        Column::new(VOLUME.into(), rows.iter().map(|r| r.volume).collect::<Vec<u64>>()),
    ])?;
    Ok(df)
}

pub fn snapshot_to_dataframe(snapshot: &SnapshotTable) -> Result<DataFrame, SchemaError> {
    let rows = &snapshot.rows;
    let df = DataFrame::new(vec![
        Column::new(SYMBOL.into(), rows.iter().map(|r| r.symbol.clone()).collect::<Vec<String>>()),
        Column::new(
            DISPLAY_NAME.into(),
            rows.iter().map(|r| r.display_name.clone()).collect::<Vec<String>>(),
        ),
        date_column(rows.iter().map(|r| epoch_days(r.date)).collect())?,
        Column::new(
            SEQUENCE_INDEX.into(),
            rows.iter().map(|r| r.sequence_index as u64).collect::<Vec<u64>>(),
        ),
        Column::new(PERIOD_RETURN.into(), rows.iter().map(|r| r.period_return).collect::<Vec<Option<f64>>>()),
        Column::new(OPEN.into(), rows.iter().map(|r| r.open).collect::<Vec<f64>>()),
        Column::new(HIGH.into(), rows.iter().map(|r| r.high).collect::<Vec<f64>>()),
        Column::new(LOW.into(), rows.iter().map(|r| r.low).collect::<Vec<f64>>()),
        Column::new(CLOSE.into(), rows.iter().map(|r| r.close).collect::<Vec<f64>>()),
        Column::new(VOLUME.into(), rows.iter().map(|r| r.volume).collect::<Vec<u64>>()),
    ])?;
    Ok(df)
}
