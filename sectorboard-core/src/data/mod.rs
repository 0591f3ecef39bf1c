//! Market data: providers, instrument set, ingestion and tabular views.

pub mod circuit_breaker;
pub mod ingest;
pub mod provider;
pub mod schema;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use ingest::{ingest, reshape, IngestReport, Ingested, MalformedBar};
pub use provider::{DataError, DataProvider, DataSource, FetchResult, Interval, RawBar};
pub use schema::{history_to_dataframe, snapshot_to_dataframe, SchemaError, TableSchema};
pub use synthetic::SyntheticProvider;
pub use universe::Universe;
pub use yahoo::{YahooProvider, YahooSettings};
