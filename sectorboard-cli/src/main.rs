//! SectorBoard CLI: refresh market data and print or export the derived tables.
//!
//! Commands:
//! - `snapshot`: refresh and print the latest-date snapshot
//! - `chart`: refresh and print one instrument's series over a date window
//! - `export`: refresh and write the History and Snapshot tables to disk
//! - `universe`: print the effective instrument list as TOML

mod obs;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use polars::prelude::{DataFrame, ParquetWriter};
use sectorboard_core::analytics::ChartSeries;
use sectorboard_core::config::ProviderKind;
use sectorboard_core::data::{history_to_dataframe, snapshot_to_dataframe};
use sectorboard_core::domain::DateRange;
use sectorboard_core::{Pipeline, RefreshStatus, SectorboardConfig, Tables};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "sectorboard",
    about = "SectorBoard CLI: index and sector ETF dashboard tables"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to the built-in ETF set.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Start date (YYYY-MM-DD); overrides the config range.
    #[arg(long, global = true)]
    start: Option<String>,

    /// End date (YYYY-MM-DD, inclusive); overrides the config range.
    #[arg(long, global = true)]
    end: Option<String>,

    /// Use deterministic synthetic bars instead of Yahoo Finance.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Upper bound on the data fetch, in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log filter (overridden by SECTORBOARD_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh and print the snapshot table.
    Snapshot {
        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Refresh and print one instrument's series.
    Chart {
        #[arg(long)]
        symbol: String,

        /// First date of the window. Defaults to the range start.
        #[arg(long)]
        from: Option<String>,

        /// Last date of the window. Defaults to the range end.
        #[arg(long)]
        to: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Refresh and write history and snapshot tables.
    Export {
        /// Output directory.
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Write Parquet instead of CSV.
        #[arg(long, default_value_t = false)]
        parquet: bool,
    },
    /// Print the effective instrument list.
    Universe,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, &cli.log_format).map_err(anyhow::Error::msg)?;

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Snapshot { json } => run_snapshot(&config, json),
        Commands::Chart {
            symbol,
            from,
            to,
            json,
        } => run_chart(&config, &symbol, from.as_deref(), to.as_deref(), json),
        Commands::Export { out, parquet } => run_export(&config, &out, parquet),
        Commands::Universe => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

/// File config (or defaults) with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<SectorboardConfig> {
    let mut config = match &cli.config {
        Some(path) => SectorboardConfig::from_file(path)?,
        None => SectorboardConfig::default(),
    };

    if cli.start.is_some() || cli.end.is_some() {
        let start = cli.start.as_deref().map(parse_date).transpose()?.unwrap_or(config.range.start());
        let end = cli.end.as_deref().map(parse_date).transpose()?.unwrap_or(config.range.end());
        config.range = DateRange::new(start, end)?;
    }
    if cli.synthetic {
        config.provider.kind = ProviderKind::Synthetic;
    }
    if let Some(secs) = cli.timeout_secs {
        config.fetch.timeout_secs = secs;
    }
    tracing::debug!(
        range = %config.range,
        provider = ?config.provider.kind,
        instruments = config.instruments.len(),
        "configuration loaded"
    );
    Ok(config)
}

fn refresh(config: &SectorboardConfig) -> Result<Arc<Tables>> {
    let pipeline = Pipeline::new(
        config.build_provider()?,
        config.universe()?,
        config.pipeline_settings(),
    );
    let tables = pipeline.refresh()?;

    let report = &tables.report;
    for (symbol, reason) in &report.failed_symbols {
        eprintln!("warning: {symbol}: {reason}");
    }
    if !report.malformed.is_empty() {
        eprintln!("warning: dropped {} malformed bars", report.malformed.len());
    }
    if tables.status() == RefreshStatus::EmptyResult {
        eprintln!("warning: the data source returned no bars for any instrument");
    }
    Ok(tables)
}

fn fmt_return(ret: Option<f64>) -> String {
    match ret {
        Some(r) => format!("{:+.2}%", r * 100.0),
        None => "-".into(),
    }
}

fn run_snapshot(config: &SectorboardConfig, json: bool) -> Result<()> {
    let tables = refresh(config)?;
    let snapshot = &tables.snapshot;

    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    let Some(as_of) = snapshot.as_of else {
        println!("No data for {}", tables.range);
        return Ok(());
    };

    println!("Snapshot as of {as_of} (generation {})", tables.generation);
    println!();
    println!(
        "{:<8} {:<30} {:>10} {:>10} {:>10} {:>10} {:>14} {:>9}",
        "Symbol", "Name", "Open", "High", "Low", "Close", "Volume", "Return"
    );
    println!("{}", "-".repeat(108));
    for row in &snapshot.rows {
        println!(
            "{:<8} {:<30} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14} {:>9}",
            row.symbol,
            row.display_name,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            fmt_return(row.period_return)
        );
    }
    Ok(())
}

/// Vertical axis bounds a chart would use: 1% padding around the lows and highs.
fn price_bounds(series: &ChartSeries) -> Option<(f64, f64)> {
    if series.is_empty() {
        return None;
    }
    let low = series.rows.iter().map(|r| r.low).fold(f64::INFINITY, f64::min);
    let high = series.rows.iter().map(|r| r.high).fold(f64::NEG_INFINITY, f64::max);
    Some((low * 0.99, high * 1.01))
}

#[derive(Serialize)]
struct ChartOutput<'a> {
    #[serde(flatten)]
    series: &'a ChartSeries,
    price_bounds: Option<(f64, f64)>,
}

fn run_chart(
    config: &SectorboardConfig,
    symbol: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let from = from.map(parse_date).transpose()?.unwrap_or(config.range.start());
    let to = to.map(parse_date).transpose()?.unwrap_or(config.range.end());

    if config.universe()?.get(symbol).is_none() {
        bail!("unknown symbol '{symbol}'; see `sectorboard universe`");
    }

    let tables = refresh(config)?;
    let series = tables.chart(symbol, from, to);
    let bounds = price_bounds(&series);

    if json {
        let out = ChartOutput {
            series: &series,
            price_bounds: bounds,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if series.is_empty() {
        println!("No bars for {symbol} between {from} and {to}");
        return Ok(());
    }

    println!("{symbol} {from} to {to}: {} bars", series.len());
    if let Some((lo, hi)) = bounds {
        println!("Price axis: {lo:.2} .. {hi:.2}");
    }
    println!();
    println!(
        "{:>6} {:<10} {:>10} {:>10} {:>10} {:>10} {:>14} {:>9}",
        "Index", "Date", "Open", "High", "Low", "Close", "Volume", "Return"
    );
    println!("{}", "-".repeat(86));
    for row in &series.rows {
        println!(
            "{:>6} {:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14} {:>9}",
            row.sequence_index,
            row.date,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            fmt_return(row.period_return)
        );
    }
    Ok(())
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, mut df: DataFrame) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    ParquetWriter::new(file).finish(&mut df)?;
    Ok(())
}

fn run_export(config: &SectorboardConfig, out: &Path, parquet: bool) -> Result<()> {
    let tables = refresh(config)?;
    std::fs::create_dir_all(out).with_context(|| format!("create {}", out.display()))?;

    let (history_path, snapshot_path) = if parquet {
        let h = out.join("history.parquet");
        let s = out.join("snapshot.parquet");
        write_parquet(&h, history_to_dataframe(&tables.history)?)?;
        write_parquet(&s, snapshot_to_dataframe(&tables.snapshot)?)?;
        (h, s)
    } else {
        let h = out.join("history.csv");
        let s = out.join("snapshot.csv");
        write_csv(&h, tables.history.rows())?;
        write_csv(&s, &tables.snapshot.rows)?;
        (h, s)
    };

    println!(
        "Wrote {} history rows to {} and {} snapshot rows to {}",
        tables.history.len(),
        history_path.display(),
        tables.snapshot.len(),
        snapshot_path.display()
    );
    println!("Dataset hash: {}", tables.dataset_hash);
    Ok(())
}
