//! Fan-out of per-city work over a fixed worker pool, fan-in to one writer.
//!
//! Worker `rank` handles the cities whose index satisfies
//! `index % workers == rank`. Each finished city is sent as a [`CityReport`]
//! over a bounded channel to the aggregator, which owns the [`CsvSink`] and
//! stdout. With `sync_every = Some(k)` every worker waits at a shared barrier
//! after each `k` city indices. A worker that panics on a city logs it and
//! moves on, so it still reaches every barrier.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use futures::FutureExt;
use log::{debug, error, info, warn};
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::{
    sync::{Barrier, mpsc},
    task::JoinSet,
};

use crate::{
    dates::{local_today, past_dates},
    model::{City, RecordType, WeatherRecord},
    partition,
    parse::parse,
    provider::{ApiRequest, Fetcher},
    sink::CsvSink,
    table::render_table,
};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_HISTORY_DAYS: u32 = 7;
pub const DEFAULT_FORECAST_DAYS: u32 = 7;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workers: usize,
    /// Barrier after every `n` city indices. `None` lets workers run freely.
    pub sync_every: Option<usize>,
    pub history_days: u32,
    pub forecast_days: u32,
    /// Reference day for the history window.
    pub today: NaiveDate,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            sync_every: None,
            history_days: DEFAULT_HISTORY_DAYS,
            forecast_days: DEFAULT_FORECAST_DAYS,
            today: local_today(),
        }
    }
}

/// Everything one worker produced for one city.
#[derive(Debug, Clone)]
pub struct CityReport {
    pub index: usize,
    pub city: City,
    /// History, Current and Forecast records, in that order.
    pub sections: Vec<(RecordType, Vec<WeatherRecord>)>,
    pub failed_fetches: usize,
    pub skipped_entries: usize,
}

impl CityReport {
    fn new(index: usize, city: City) -> Self {
        Self { index, city, sections: Vec::new(), failed_fetches: 0, skipped_entries: 0 }
    }

    pub fn records(&self) -> impl Iterator<Item = &WeatherRecord> {
        self.sections.iter().flat_map(|(_, records)| records.iter())
    }

    /// Fetch and decode one request. Failures are logged and counted, never raised.
    async fn collect(&mut self, fetcher: &dyn Fetcher, request: &ApiRequest) -> Vec<WeatherRecord> {
        let Some(record_type) = request.record_type() else {
            debug!("{request} carries no weather records");
            return Vec::new();
        };

        let body = match fetcher.fetch(request).await {
            Ok(body) => body,
            Err(err) => {
                error!("❌ {:#}", anyhow::Error::new(err));
                self.failed_fetches += 1;
                return Vec::new();
            }
        };

        match parse(&body, record_type, self.city.as_str()) {
            Ok(parsed) => {
                for skipped in &parsed.skipped {
                    warn!("skipping entry in {request}: {skipped}");
                }
                self.skipped_entries += parsed.skipped.len();
                parsed.records
            }
            Err(err) => {
                warn!("skipping {request}: {:#}", anyhow::Error::new(err));
                self.skipped_entries += 1;
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cities: usize,
    pub records_written: usize,
    pub failed_fetches: usize,
    pub skipped_entries: usize,
}

/// History for each past day, then current conditions, then the forecast.
pub async fn process_city(
    fetcher: &dyn Fetcher,
    index: usize,
    city: &City,
    options: &RunOptions,
) -> CityReport {
    let mut report = CityReport::new(index, city.clone());

    let mut history = Vec::new();
    for date in past_dates(options.today, options.history_days) {
        let request = ApiRequest::History { city: city.clone(), date };
        history.extend(report.collect(fetcher, &request).await);
    }
    report.sections.push((RecordType::History, history));

    let current = report.collect(fetcher, &ApiRequest::Current { city: city.clone() }).await;
    report.sections.push((RecordType::Current, current));

    let request = ApiRequest::Forecast { city: city.clone(), days: options.forecast_days };
    let forecast = report.collect(fetcher, &request).await;
    report.sections.push((RecordType::Forecast, forecast));

    report
}

#[derive(Debug)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: RunOptions) -> Result<Self> {
        if options.workers == 0 {
            return Err(anyhow!("Worker count must be at least 1."));
        }
        if options.sync_every == Some(0) {
            return Err(anyhow!("Synchronization interval must be at least 1 city."));
        }
        Ok(Self { fetcher, options })
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Process every city and write its records to `sink`.
    ///
    /// Only a sink failure aborts the run; fetch and decode failures end up in
    /// the returned summary.
    pub async fn run(&self, cities: Vec<City>, mut sink: CsvSink) -> Result<RunSummary> {
        let workers = self.options.workers;
        let cities = Arc::new(cities);
        info!("processing {} cities with {} workers", cities.len(), workers);

        let (tx, mut rx) = mpsc::channel::<CityReport>(workers * 2);
        let barrier = self.options.sync_every.map(|_| Arc::new(Barrier::new(workers)));

        let mut set = JoinSet::new();
        for rank in 0..workers {
            let worker = Worker {
                rank,
                cities: Arc::clone(&cities),
                fetcher: Arc::clone(&self.fetcher),
                options: self.options.clone(),
                tx: tx.clone(),
                barrier: barrier.clone(),
            };
            set.spawn(worker.run());
        }
        // The channel closes once every worker has dropped its sender.
        drop(tx);

        let mut summary = RunSummary::default();
        while let Some(report) = rx.recv().await {
            for (record_type, records) in &report.sections {
                print!("{}", render_table(report.city.as_str(), *record_type, records));
            }

            let records: Vec<WeatherRecord> = report.records().cloned().collect();
            // Returning drops the JoinSet, which aborts the remaining workers.
            let written = sink.append(&records)?;
            println!("✅ Data saved for {} in {}", report.city, sink.path().display());

            summary.cities += 1;
            summary.records_written += written;
            summary.failed_fetches += report.failed_fetches;
            summary.skipped_entries += report.skipped_entries;
        }

        while let Some(joined) = set.join_next().await {
            if let Err(err) = joined {
                error!("worker task failed: {err}");
            }
        }

        info!(
            "run finished: {} cities, {} records, {} failed fetches, {} skipped entries",
            summary.cities, summary.records_written, summary.failed_fetches, summary.skipped_entries
        );
        Ok(summary)
    }
}

struct Worker {
    rank: usize,
    cities: Arc<Vec<City>>,
    fetcher: Arc<dyn Fetcher>,
    options: RunOptions,
    tx: mpsc::Sender<CityReport>,
    barrier: Option<Arc<Barrier>>,
}

impl Worker {
    async fn run(self) {
        let workers = self.options.workers;

        // Every worker walks every index so that all of them reach each barrier.
        for (index, city) in self.cities.iter().enumerate() {
            if partition::owns(index, self.rank, workers) {
                debug!("worker {} takes city #{index} ({city})", self.rank);
                let work = process_city(self.fetcher.as_ref(), index, city, &self.options);
                match AssertUnwindSafe(work).catch_unwind().await {
                    Ok(report) => {
                        if self.tx.send(report).await.is_err() {
                            warn!("worker {} stopping: aggregator is gone", self.rank);
                            return;
                        }
                    }
                    Err(_) => error!(
                        "❌ worker {} panicked on city #{index} ({city}); skipping it",
                        self.rank
                    ),
                }
            }

            if let (Some(barrier), Some(every)) = (&self.barrier, self.options.sync_every) {
                if (index + 1) % every == 0 {
                    barrier.wait().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FetchError,
        model::CSV_HEADER,
        parse::tests::{current_body, day_entry, days_body},
    };
    use async_trait::async_trait;
    use std::{collections::HashSet, fs, sync::Mutex, time::Duration};

    /// Serves canned bodies. Cities in `failing` get a transport-like error,
    /// cities in `garbage` get an unparseable body, history for `failing_dates`
    /// errors and cities in `panicking` panic.
    #[derive(Debug, Default)]
    struct FakeFetcher {
        failing: HashSet<String>,
        garbage: HashSet<String>,
        failing_dates: HashSet<NaiveDate>,
        panicking: HashSet<String>,
        forecast_days: usize,
        slow: Option<(String, Duration)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self { forecast_days: 1, ..Default::default() }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, request: &ApiRequest) -> Result<String, FetchError> {
            let city = request.city().to_string();
            self.calls.lock().unwrap().push(request.to_string());

            if let Some((slow_city, delay)) = &self.slow {
                if *slow_city == city {
                    tokio::time::sleep(*delay).await;
                }
            }
            if self.panicking.contains(&city) {
                panic!("fetcher blew up on {city}");
            }
            let bad_day = matches!(
                request,
                ApiRequest::History { date, .. } if self.failing_dates.contains(date)
            );
            if self.failing.contains(&city) || bad_day {
                return Err(FetchError::Status {
                    request: request.to_string(),
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    body: "upstream down".into(),
                });
            }
            if self.garbage.contains(&city) {
                return Ok(String::new());
            }

            Ok(match request {
                ApiRequest::History { date, .. } => {
                    days_body(vec![day_entry(&date.format("%Y-%m-%d").to_string(), 10.0)])
                }
                ApiRequest::Current { .. } => current_body("2025-11-03 14:15", 11.0),
                ApiRequest::Forecast { .. } => days_body(
                    (0..self.forecast_days)
                        .map(|d| day_entry(&format!("2025-11-{:02}", 4 + d), 12.0))
                        .collect(),
                ),
                other => panic!("pipeline never sends {other}"),
            })
        }
    }

    fn options(workers: usize, sync_every: Option<usize>) -> RunOptions {
        RunOptions {
            workers,
            sync_every,
            today: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            ..RunOptions::default()
        }
    }

    fn cities(names: &[&str]) -> Vec<City> {
        names.iter().map(|n| City::new(*n)).collect()
    }

    fn rows(path: &std::path::Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn single_city_single_worker_writes_nine_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let fetcher = Arc::new(FakeFetcher::new());
        let pipeline = Pipeline::new(fetcher.clone(), options(1, Some(1))).unwrap();

        let summary =
            pipeline.run(cities(&["London"]), CsvSink::create(&path).unwrap()).await.unwrap();

        assert_eq!(
            summary,
            RunSummary { cities: 1, records_written: 9, failed_fetches: 0, skipped_entries: 0 }
        );

        let lines = rows(&path);
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], CSV_HEADER);
        for line in &lines[1..] {
            let cols: Vec<&str> = line.split(',').collect();
            assert_eq!(cols[0], "London");
            assert!(["History", "Current", "Forecast"].contains(&cols[1]));
        }
        assert_eq!(lines.iter().filter(|l| l.contains(",History,")).count(), 7);
        assert_eq!(lines.iter().filter(|l| l.contains(",Current,")).count(), 1);
        assert_eq!(lines.iter().filter(|l| l.contains(",Forecast,")).count(), 1);

        // 7 history + current + forecast.
        assert_eq!(fetcher.calls().len(), 9);
    }

    #[tokio::test]
    async fn history_window_ends_yesterday() {
        let fetcher = FakeFetcher::new();
        let report = process_city(&fetcher, 0, &City::new("Oslo"), &options(1, None)).await;

        let (record_type, history) = &report.sections[0];
        assert_eq!(*record_type, RecordType::History);
        let dates: Vec<&str> = history.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(
            dates,
            vec![
                "2025-10-27",
                "2025-10-28",
                "2025-10-29",
                "2025-10-30",
                "2025-10-31",
                "2025-11-01",
                "2025-11-02",
            ]
        );
    }

    #[tokio::test]
    async fn forecast_rows_follow_payload_day_count() {
        let fetcher = FakeFetcher { forecast_days: 7, ..FakeFetcher::new() };
        let report = process_city(&fetcher, 0, &City::new("Oslo"), &options(1, None)).await;

        let (record_type, forecast) = &report.sections[2];
        assert_eq!(*record_type, RecordType::Forecast);
        assert_eq!(forecast.len(), 7);
    }

    #[tokio::test]
    async fn failing_city_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let fetcher = FakeFetcher {
            failing: HashSet::from(["Atlantis".to_string()]),
            ..FakeFetcher::new()
        };
        let pipeline = Pipeline::new(Arc::new(fetcher), options(2, None)).unwrap();

        let summary = pipeline
            .run(cities(&["Atlantis", "Paris", "Rome"]), CsvSink::create(&path).unwrap())
            .await
            .unwrap();

        assert_eq!(summary.cities, 3);
        assert_eq!(summary.failed_fetches, 9);
        assert_eq!(summary.records_written, 18);

        let lines = rows(&path);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Atlantis,")).count(), 0);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Paris,")).count(), 9);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Rome,")).count(), 9);
    }

    #[tokio::test]
    async fn failed_history_days_shrink_history_section() {
        let day = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        let fetcher = FakeFetcher {
            failing_dates: HashSet::from([day(10, 28), day(10, 30), day(11, 2)]),
            ..FakeFetcher::new()
        };

        let report = process_city(&fetcher, 0, &City::new("Oslo"), &options(1, None)).await;

        assert_eq!(report.failed_fetches, 3);
        assert_eq!(report.skipped_entries, 0);
        let (_, history) = &report.sections[0];
        let dates: Vec<&str> = history.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-10-27", "2025-10-29", "2025-10-31", "2025-11-01"]);
        assert_eq!(report.sections[1].1.len(), 1);
        assert_eq!(report.sections[2].1.len(), 1);
        // Every day was still asked for.
        assert_eq!(fetcher.calls().len(), 9);
    }

    #[tokio::test]
    async fn panicking_city_does_not_stall_barrier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let fetcher = FakeFetcher {
            panicking: HashSet::from(["Boom".to_string()]),
            ..FakeFetcher::new()
        };
        let pipeline = Pipeline::new(Arc::new(fetcher), options(2, Some(1))).unwrap();

        let run = pipeline.run(
            cities(&["Boom", "Paris", "Rome", "Lima"]),
            CsvSink::create(&path).unwrap(),
        );
        let summary = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("run should not hang at the barrier")
            .unwrap();

        assert_eq!(summary.cities, 3);
        assert_eq!(summary.records_written, 27);
        let lines = rows(&path);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Boom,")).count(), 0);
        for city in ["Paris,", "Rome,", "Lima,"] {
            assert_eq!(lines.iter().filter(|l| l.starts_with(city)).count(), 9);
        }
    }

    #[tokio::test]
    async fn invalid_bodies_are_skipped_without_crashing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let fetcher = FakeFetcher {
            garbage: HashSet::from(["Nowhere".to_string()]),
            ..FakeFetcher::new()
        };
        let pipeline = Pipeline::new(Arc::new(fetcher), options(1, None)).unwrap();

        let summary = pipeline
            .run(cities(&["Nowhere", "Berlin"]), CsvSink::create(&path).unwrap())
            .await
            .unwrap();

        assert_eq!(summary.skipped_entries, 9);
        assert_eq!(summary.failed_fetches, 0);
        assert_eq!(summary.records_written, 9);
        assert_eq!(rows(&path).len(), 10);
    }

    #[tokio::test]
    async fn header_written_once_for_any_worker_count() {
        for workers in 1..=5 {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("out.csv");
            let pipeline =
                Pipeline::new(Arc::new(FakeFetcher::new()), options(workers, None)).unwrap();

            pipeline
                .run(cities(&["A", "B", "C", "D"]), CsvSink::create(&path).unwrap())
                .await
                .unwrap();

            let lines = rows(&path);
            assert_eq!(lines[0], CSV_HEADER);
            assert_eq!(lines.iter().filter(|l| l.as_str() == CSV_HEADER).count(), 1);
            assert_eq!(lines.len(), 1 + 4 * 9);
        }
    }

    #[tokio::test]
    async fn per_city_fence_keeps_city_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        // The first city is slowest; without the fence it would finish last.
        let fetcher = FakeFetcher {
            slow: Some(("Lima".to_string(), Duration::from_millis(20))),
            ..FakeFetcher::new()
        };
        let pipeline = Pipeline::new(Arc::new(fetcher), options(3, Some(1))).unwrap();

        pipeline
            .run(cities(&["Lima", "Quito", "Bogota", "Caracas"]), CsvSink::create(&path).unwrap())
            .await
            .unwrap();

        let order: Vec<String> = rows(&path)[1..]
            .iter()
            .map(|l| l.split(',').next().unwrap().to_string())
            .collect::<Vec<_>>()
            .chunks(9)
            .map(|chunk| chunk[0].clone())
            .collect();
        assert_eq!(order, vec!["Lima", "Quito", "Bogota", "Caracas"]);
    }

    #[tokio::test]
    async fn more_workers_than_cities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let pipeline = Pipeline::new(Arc::new(FakeFetcher::new()), options(8, Some(2))).unwrap();

        let summary = pipeline
            .run(cities(&["Cairo", "Accra", "Dakar"]), CsvSink::create(&path).unwrap())
            .await
            .unwrap();

        assert_eq!(summary.cities, 3);
        assert_eq!(rows(&path).len(), 1 + 27);
    }

    #[tokio::test]
    async fn empty_city_list_leaves_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let pipeline = Pipeline::new(Arc::new(FakeFetcher::new()), options(3, Some(1))).unwrap();

        let summary = pipeline.run(Vec::new(), CsvSink::create(&path).unwrap()).await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(rows(&path), vec![CSV_HEADER.to_string()]);
    }

    #[test]
    fn zero_workers_rejected() {
        let err = Pipeline::new(Arc::new(FakeFetcher::new()), options(0, None)).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn zero_sync_interval_rejected() {
        let err = Pipeline::new(Arc::new(FakeFetcher::new()), options(2, Some(0))).unwrap_err();
        assert!(err.to_string().contains("Synchronization interval"));
    }
}
