use crate::domain::RangeError;
use thiserror::Error;

/// Failures of a refresh cycle, as seen by the caller of the pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// The provider could not be reached at all, or the fetch timed out.
    /// Previously published tables stay in effect.
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(String),

    /// The provider answered but had no bars for any instrument.
    #[error("data source returned no bars for any instrument")]
    EmptyResult,

    /// Another refresh is running and the caller asked not to wait.
    #[error("a refresh is already in progress")]
    RefreshInProgress,

    #[error("invalid date range: {0}")]
    InvalidRange(#[from] RangeError),
}
