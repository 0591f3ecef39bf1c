//! Refresh pipeline: ingestion, derivation, and atomic publication.
//!
//! A `Pipeline` owns the provider and instrument set and holds the most
//! recently published `Tables`. Refreshes are serialized; readers take an
//! `Arc<Tables>` and never see a History from one refresh paired with a
//! Snapshot from another.

use crate::analytics::{chart_series, derive_tables, ChartSeries};
use crate::data::ingest::{ingest, IngestReport, Ingested};
use crate::data::provider::{DataProvider, Interval};
use crate::data::universe::Universe;
use crate::domain::{DateRange, HistoryTable, SnapshotTable};
use crate::error::PipelineError;
use crate::fingerprint;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub range: DateRange,
    pub interval: Interval,
    /// Upper bound on the provider call of one refresh.
    pub fetch_timeout: Duration,
}

impl PipelineSettings {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            interval: Interval::Daily,
            fetch_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshStatus {
    Complete,
    /// The source was reachable but had no bars for any instrument.
    EmptyResult,
}

/// One matched History/Snapshot pair plus what produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Tables {
    pub generation: u64,
    pub range: DateRange,
    pub history: HistoryTable,
    pub snapshot: SnapshotTable,
    pub report: IngestReport,
    pub dataset_hash: String,
    pub refreshed_at: DateTime<Utc>,
}

impl Tables {
    pub fn status(&self) -> RefreshStatus {
        if self.report.is_empty_result() {
            RefreshStatus::EmptyResult
        } else {
            RefreshStatus::Complete
        }
    }

    /// For callers that treat "no data at all" as an error.
    pub fn require_data(&self) -> Result<&Self, PipelineError> {
        match self.status() {
            RefreshStatus::Complete => Ok(self),
            RefreshStatus::EmptyResult => Err(PipelineError::EmptyResult),
        }
    }

    pub fn chart(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> ChartSeries {
        chart_series(&self.history, symbol, from, to)
    }
}

pub struct Pipeline {
    provider: Arc<dyn DataProvider>,
    universe: Arc<Universe>,
    settings: PipelineSettings,
    refresh_guard: Mutex<()>,
    published: RwLock<Option<Arc<Tables>>>,
    generation: AtomicU64,
    /// Result channel of a fetch that outlived its timeout.
    abandoned: Mutex<Option<Receiver<Result<Ingested, PipelineError>>>>,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn DataProvider>, universe: Universe, settings: PipelineSettings) -> Self {
        Self {
            provider,
            universe: Arc::new(universe),
            settings,
            refresh_guard: Mutex::new(()),
            published: RwLock::new(None),
            generation: AtomicU64::new(0),
            abandoned: Mutex::new(None),
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Refresh over the configured range, waiting for any running refresh.
    pub fn refresh(&self) -> Result<Arc<Tables>, PipelineError> {
        self.refresh_range(self.settings.range)
    }

    pub fn refresh_range(&self, range: DateRange) -> Result<Arc<Tables>, PipelineError> {
        let _guard = self.refresh_guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_locked(range)
    }

    pub fn refresh_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Arc<Tables>, PipelineError> {
        self.refresh_range(DateRange::new(start, end)?)
    }

    /// Like `refresh`, but gives up at once if another refresh is running.
    pub fn try_refresh(&self) -> Result<Arc<Tables>, PipelineError> {
        let _guard = match self.refresh_guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("refresh already running; request dropped");
                return Err(PipelineError::RefreshInProgress);
            }
        };
        self.run_locked(self.settings.range)
    }

    /// The latest published tables, if any refresh has succeeded.
    pub fn current(&self) -> Option<Arc<Tables>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Range retrieval against the latest published History.
    pub fn chart(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> ChartSeries {
        match self.current() {
            Some(tables) => tables.chart(symbol, from, to),
            None => chart_series(&HistoryTable::default(), symbol, from, to),
        }
    }

    fn run_locked(&self, range: DateRange) -> Result<Arc<Tables>, PipelineError> {
        let started = Instant::now();
        let ingested = match self.fetch_bounded(range) {
            Ok(ingested) => ingested,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "refresh failed; previous tables kept"
                );
                return Err(e);
            }
        };

        let derived = derive_tables(&ingested.bars, &self.universe);
        let dataset_hash = fingerprint::dataset_hash(&derived.history, &derived.snapshot);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let tables = Arc::new(Tables {
            generation,
            range,
            history: derived.history,
            snapshot: derived.snapshot,
            report: ingested.report,
            dataset_hash,
            refreshed_at: Utc::now(),
        });

        *self.published.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&tables));

        tracing::info!(
            generation,
            rows = tables.history.len(),
            snapshot_rows = tables.snapshot.len(),
            status = ?tables.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tables published"
        );
        Ok(tables)
    }

    /// Run ingestion on a worker thread, bounded by `fetch_timeout`.
    ///
    /// On expiry the worker is left to finish on its own and its receiver is
    /// parked in `abandoned`. At most one fetch runs at a time: the next
    /// refresh first waits (within its own deadline) for the abandoned one,
    /// discards its result, and only then starts a new worker.
    fn fetch_bounded(&self, range: DateRange) -> Result<Ingested, PipelineError> {
        let timeout = self.settings.fetch_timeout;
        let deadline = Instant::now() + timeout;
        self.drain_abandoned(deadline)?;

        let (tx, rx) = mpsc::channel();
        let provider = Arc::clone(&self.provider);
        let universe = Arc::clone(&self.universe);
        let interval = self.settings.interval;

        thread::Builder::new()
            .name("sectorboard-fetch".into())
            .spawn(move || {
                let outcome = ingest(provider.as_ref(), &universe, range, interval);
                let _ = tx.send(outcome);
            })
            .map_err(|e| PipelineError::DataSourceUnavailable(format!("could not start fetch: {e}")))?;

        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                *self.abandoned.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
                Err(PipelineError::DataSourceUnavailable(format!(
                    "fetch timed out after {:.1}s",
                    timeout.as_secs_f64()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::DataSourceUnavailable(
                "fetch worker exited without a result".into(),
            )),
        }
    }

    fn drain_abandoned(&self, deadline: Instant) -> Result<(), PipelineError> {
        let mut abandoned = self.abandoned.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(rx) = abandoned.take() else {
            return Ok(());
        };
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(_) | Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("abandoned fetch finished; result discarded");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                *abandoned = Some(rx);
                Err(PipelineError::DataSourceUnavailable(
                    "previous fetch is still running".into(),
                ))
            }
        }
    }
}
