//! SectorBoard Core: market-data ingestion and derived tables for a
//! sector/index dashboard.
//!
//! This crate contains:
//! - Domain types (bars, instruments, date ranges, History and Snapshot rows)
//! - Data providers (Yahoo Finance, synthetic) behind the `DataProvider` trait
//! - Ingestion and reshape into a long `(date, symbol)` table
//! - The derived-column engine (sequence index, period return, snapshot)
//! - Range-filtered chart retrieval
//! - The `Pipeline`, which serializes refreshes and publishes matched tables

pub mod analytics;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod pipeline;

pub use config::{ConfigError, SectorboardConfig};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineSettings, RefreshStatus, Tables};
