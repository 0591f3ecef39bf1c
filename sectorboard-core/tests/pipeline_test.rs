//! Pipeline behaviour across threads: timeouts, failures, and concurrent
//! refreshes.

use chrono::NaiveDate;
use sectorboard_core::data::{
    DataError, DataProvider, DataSource, FetchResult, Interval, RawBar, SyntheticProvider, Universe,
};
use sectorboard_core::domain::DateRange;
use sectorboard_core::{Pipeline, PipelineError, PipelineSettings, RefreshStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn december() -> DateRange {
    DateRange::new(d(2020, 12, 1), d(2020, 12, 31)).unwrap()
}

fn settings(timeout: Duration) -> PipelineSettings {
    PipelineSettings {
        range: december(),
        interval: Interval::Daily,
        fetch_timeout: timeout,
    }
}

/// Sleeps before answering; each call closes one unit higher than the last.
struct Slow {
    delay: Duration,
    calls: AtomicUsize,
}

impl DataProvider for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        _end: NaiveDate,
        _interval: Interval,
    ) -> Result<FetchResult, DataError> {
        thread::sleep(self.delay);
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
        let bar = RawBar {
            date: start,
            open: 100.0 + n,
            high: 100.0 + n,
            low: 100.0 + n,
            close: 100.0 + n,
            volume: 1,
        };
        Ok(FetchResult {
            symbol: symbol.into(),
            bars: vec![bar],
            source: DataSource::InMemory,
        })
    }
}

/// Fails with a connectivity error while `down` is set. Symbols the inner
/// provider does not list are "not found" either way.
struct Flaky {
    down: AtomicBool,
    inner: SyntheticProvider,
    delisted: Option<&'static str>,
}

impl DataProvider for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError> {
        if Some(symbol) == self.delisted {
            self.inner.fetch(symbol, start, end, interval)
        } else if self.down.load(Ordering::SeqCst) {
            Err(DataError::NetworkUnreachable("connection refused".into()))
        } else {
            self.inner.fetch(symbol, start, end, interval)
        }
    }
}

#[test]
fn fetch_exceeding_timeout_is_data_source_unavailable() {
    let provider = Arc::new(Slow {
        delay: Duration::from_millis(500),
        calls: AtomicUsize::new(0),
    });
    let universe = Universe::from_pairs(&[("SPY", "S&P 500")]).unwrap();
    let pipeline = Pipeline::new(provider, universe, settings(Duration::from_millis(50)));

    let err = pipeline.refresh().unwrap_err();
    assert!(matches!(err, PipelineError::DataSourceUnavailable(ref m) if m.contains("timed out")));
    assert!(pipeline.current().is_none());

    // The abandoned fetch finishing later must not publish anything.
    thread::sleep(Duration::from_millis(700));
    assert!(pipeline.current().is_none());
}

#[test]
fn failed_refresh_keeps_previous_generation() {
    let provider = Arc::new(Flaky {
        down: AtomicBool::new(false),
        inner: SyntheticProvider::new(),
        delisted: None,
    });
    let pipeline = Pipeline::new(
        Arc::clone(&provider) as Arc<dyn DataProvider>,
        Universe::default_etfs(),
        settings(Duration::from_secs(30)),
    );

    let first = pipeline.refresh().unwrap();
    assert_eq!(first.status(), RefreshStatus::Complete);

    provider.down.store(true, Ordering::SeqCst);
    assert!(matches!(
        pipeline.refresh(),
        Err(PipelineError::DataSourceUnavailable(_))
    ));

    let kept = pipeline.current().unwrap();
    assert_eq!(kept.generation, first.generation);
    assert_eq!(kept.dataset_hash, first.dataset_hash);

    provider.down.store(false, Ordering::SeqCst);
    let next = pipeline.refresh().unwrap();
    assert_eq!(next.generation, first.generation + 1);
}

#[test]
fn outage_with_delisted_symbol_keeps_previous_tables() {
    let provider = Arc::new(Flaky {
        down: AtomicBool::new(false),
        inner: SyntheticProvider::new().without("IWN"),
        delisted: Some("IWN"),
    });
    let universe = Universe::from_pairs(&[("SPY", "S&P 500"), ("IWN", "Russell"), ("QQQ", "Nasdaq")]).unwrap();
    let pipeline = Pipeline::new(
        Arc::clone(&provider) as Arc<dyn DataProvider>,
        universe,
        settings(Duration::from_secs(30)),
    );

    let good = pipeline.refresh().unwrap();
    assert_eq!(good.snapshot.len(), 2);

    provider.down.store(true, Ordering::SeqCst);
    assert!(matches!(
        pipeline.refresh(),
        Err(PipelineError::DataSourceUnavailable(_))
    ));

    let kept = pipeline.current().unwrap();
    assert_eq!(kept.generation, good.generation);
    assert_eq!(kept.history.len(), good.history.len());
}

/// Counts provider calls in flight and remembers the peak.
struct Gauge {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: Mutex<(usize, usize)>,
}

impl DataProvider for Gauge {
    fn name(&self) -> &str {
        "gauge"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        _end: NaiveDate,
        _interval: Interval,
    ) -> Result<FetchResult, DataError> {
        {
            let mut g = self.in_flight.lock().unwrap();
            g.0 += 1;
            g.1 = g.1.max(g.0);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.in_flight.lock().unwrap().0 -= 1;
        Ok(FetchResult {
            symbol: symbol.into(),
            bars: vec![RawBar {
                date: start,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1,
            }],
            source: DataSource::InMemory,
        })
    }
}

#[test]
fn timed_out_fetch_is_never_overlapped() {
    let provider = Arc::new(Gauge {
        delay: Duration::from_millis(400),
        calls: AtomicUsize::new(0),
        in_flight: Mutex::new((0, 0)),
    });
    let universe = Universe::from_pairs(&[("SPY", "S&P 500")]).unwrap();
    let pipeline = Pipeline::new(
        Arc::clone(&provider) as Arc<dyn DataProvider>,
        universe,
        settings(Duration::from_millis(20)),
    );

    for _ in 0..5 {
        assert!(matches!(
            pipeline.refresh(),
            Err(PipelineError::DataSourceUnavailable(_))
        ));
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // Once the abandoned fetch is done, the next refresh starts a new one.
    thread::sleep(Duration::from_millis(500));
    assert!(pipeline.refresh().is_err());

    thread::sleep(Duration::from_millis(500));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    assert_eq!(provider.in_flight.lock().unwrap().1, 1);
    assert!(pipeline.current().is_none());
}

#[test]
fn concurrent_refreshes_publish_consistent_pairs() {
    let provider = Arc::new(Slow {
        delay: Duration::from_millis(5),
        calls: AtomicUsize::new(0),
    });
    let universe = Universe::from_pairs(&[("SPY", "S&P 500"), ("QQQ", "Nasdaq")]).unwrap();
    let pipeline = Arc::new(Pipeline::new(provider, universe, settings(Duration::from_secs(30))));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                (0..3)
                    .map(|_| pipeline.refresh().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut generations = Vec::new();
    for worker in workers {
        for tables in worker.join().unwrap() {
            // Every published snapshot comes from its own history.
            for row in &tables.snapshot.rows {
                let hist = tables.history.symbol_rows(&row.symbol).last().unwrap();
                assert_eq!(hist.close, row.close);
                assert_eq!(hist.date, row.date);
            }
            generations.push(tables.generation);
        }
    }

    generations.sort_unstable();
    assert_eq!(generations, (1..=12).collect::<Vec<u64>>());
    assert_eq!(pipeline.current().unwrap().generation, 12);
}

#[test]
fn try_refresh_reports_in_progress_while_another_runs() {
    let provider = Arc::new(Slow {
        delay: Duration::from_millis(300),
        calls: AtomicUsize::new(0),
    });
    let universe = Universe::from_pairs(&[("SPY", "S&P 500")]).unwrap();
    let pipeline = Arc::new(Pipeline::new(provider, universe, settings(Duration::from_secs(30))));

    let background = {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || pipeline.refresh())
    };
    thread::sleep(Duration::from_millis(100));

    assert_eq!(pipeline.try_refresh().unwrap_err(), PipelineError::RefreshInProgress);
    assert!(background.join().unwrap().is_ok());
    assert_eq!(pipeline.current().unwrap().generation, 1);
}

#[test]
fn chart_reads_latest_history() {
    let pipeline = Pipeline::new(
        Arc::new(SyntheticProvider::new()),
        Universe::default_etfs(),
        settings(Duration::from_secs(30)),
    );
    pipeline.refresh().unwrap();

    let series = pipeline.chart("XLK", d(2020, 12, 7), d(2020, 12, 11));
    assert_eq!(series.len(), 5);
    let idx = series.sequence_indices();
    assert!(idx.windows(2).all(|w| w[1] == w[0] + 1));
    // Indices keep their place in the full series.
    assert_eq!(idx[0], 4);

    assert!(pipeline.chart("XLK", d(2020, 12, 11), d(2020, 12, 7)).is_empty());
    assert!(pipeline.chart("NOPE", d(2020, 12, 1), d(2020, 12, 31)).is_empty());
}
