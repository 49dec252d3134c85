// 🔁 Fetch Register Job - the full sync pipeline for one run
// fetch -> normalize -> map -> reconcile, wrapped by the failure handler:
// any fetch or feed error aborts the run, is reported exactly once to the
// error sink, and never enqueues follow-up work. Mapping happens for the
// whole feed before the first store write, so a malformed feed leaves the
// store untouched.

use crate::error::SyncError;
use crate::fetcher::RegisterClient;
use crate::mapper::{map_records, LocationAttributes};
use crate::reconcile::{reconcile_record, SyncReport};
use crate::schema::parse_feed;
use crate::store::LocationStore;
use tracing::{debug, error, info};

/// Queue name under which runs of this job are deferred.
pub const JOB_NAME: &str = "fetch_country_register";

// ============================================================================
// COLLABORATOR SEAMS
// ============================================================================

/// External observability sink. Called exactly once per failed run with
/// the error kind and cause; never called on success.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &SyncError);
}

/// Reporter that forwards failures to the log.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &SyncError) {
        error!(kind = error.kind(), cause = %error, "register sync failed");
    }
}

/// External task runner seam. `enqueue` defers a named job; the core never
/// enqueues anything as a consequence of a failed run.
pub trait JobScheduler: Send + Sync {
    fn enqueue(&self, job_name: &str);
}

/// Scheduler for contexts with no queue (the one-shot CLI).
pub struct NullScheduler;

impl JobScheduler for NullScheduler {
    fn enqueue(&self, _job_name: &str) {}
}

// ============================================================================
// PURE CORE
// ============================================================================

/// Feed bytes to the ordered attribute sets to upsert. No I/O: this is the
/// whole pipeline minus the network call and the store writes, so it is
/// directly unit-testable without either.
pub fn plan_sync(bytes: &[u8]) -> Result<Vec<LocationAttributes>, SyncError> {
    let feed = parse_feed(bytes)?;
    let records = feed.normalize();
    map_records(&records)
}

// ============================================================================
// JOB
// ============================================================================

/// One queue-triggered synchronization job.
pub struct FetchRegisterJob<'a> {
    client: &'a dyn RegisterClient,
    reporter: &'a dyn ErrorReporter,
    scheduler: &'a dyn JobScheduler,
}

impl<'a> FetchRegisterJob<'a> {
    pub fn new(
        client: &'a dyn RegisterClient,
        reporter: &'a dyn ErrorReporter,
        scheduler: &'a dyn JobScheduler,
    ) -> Self {
        FetchRegisterJob {
            client,
            reporter,
            scheduler,
        }
    }

    /// Ask the task runner to defer a run of this job.
    pub fn enqueue(&self) {
        self.scheduler.enqueue(JOB_NAME);
    }

    /// Execute one run. On failure the error is reported once and returned;
    /// nothing is enqueued on either path - the surrounding queue decides
    /// whether another run happens.
    pub fn run(&self, store: &LocationStore) -> Result<SyncReport, SyncError> {
        match self.execute(store) {
            Ok(report) => {
                info!("{}", report.summary());
                Ok(report)
            }
            Err(error) => {
                self.reporter.report(&error);
                Err(error)
            }
        }
    }

    fn execute(&self, store: &LocationStore) -> Result<SyncReport, SyncError> {
        debug!("fetching register feed");
        let bytes = self.client.fetch_records()?;

        debug!(bytes = bytes.len(), "normalizing and mapping feed");
        let attributes = plan_sync(&bytes)?;

        debug!(records = attributes.len(), "reconciling records");
        let mut report = SyncReport {
            fetched: attributes.len(),
            ..Default::default()
        };
        for attrs in &attributes {
            let outcome = reconcile_record(store, attrs)?;
            report.record(&outcome);
        }

        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use std::sync::Mutex;

    const ARRAY_FEED: &str = r#"
    [
        {
            "serial-number": 6,
            "hash": "2778fa2a0a97b98728053b4caf7fee918aa0357c",
            "entry": {
                "citizen-names": "Briton;British citizen",
                "country": "GB",
                "name": "United Kingdom",
                "official-name": "The United Kingdom of Great Britain and Northern Ireland",
                "start-date": "1707-05-01",
                "end-date": "2017-12-31"
            }
        }
    ]
    "#;

    const MAP_FEED: &str = r#"
    {
        "GB": {
            "entry-number": "6",
            "item-hash": "sha-256:6b18693874513ba13da54d61aafa7cad0c8f5573f3431d6f1c04b07ddb27d6bb",
            "entry-timestamp": "2016-04-05T13:23:05Z",
            "citizen-names": "Briton;British citizen",
            "country": "GB",
            "name": "United Kingdom",
            "official-name": "The United Kingdom of Great Britain and Northern Ireland",
            "start-date": "1707-05-01",
            "end-date": "2017-12-31"
        }
    }
    "#;

    // Array-shape feed with no date fields, matching an already-stored
    // location exactly.
    const UNCHANGED_FEED: &str = r#"
    [
        {
            "serial-number": 6,
            "entry": {
                "country": "GB",
                "name": "United Kingdom"
            }
        }
    ]
    "#;

    struct StaticClient(String);

    impl StaticClient {
        fn new(feed: &str) -> Self {
            StaticClient(feed.to_string())
        }
    }

    impl RegisterClient for StaticClient {
        fn fetch_records(&self) -> Result<Vec<u8>, SyncError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    struct FailingClient {
        status: u16,
    }

    impl RegisterClient for FailingClient {
        fn fetch_records(&self) -> Result<Vec<u8>, SyncError> {
            Err(SyncError::unavailable(
                Some(self.status),
                format!("register returned HTTP {}", self.status),
            ))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<(String, String)>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, error: &SyncError) {
            self.reports
                .lock()
                .unwrap()
                .push((error.kind().to_string(), error.to_string()));
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        enqueued: Mutex<Vec<String>>,
    }

    impl JobScheduler for RecordingScheduler {
        fn enqueue(&self, job_name: &str) {
            self.enqueued.lock().unwrap().push(job_name.to_string());
        }
    }

    fn run_once(
        client: &dyn RegisterClient,
        store: &LocationStore,
    ) -> (Result<SyncReport, SyncError>, usize, usize) {
        let reporter = RecordingReporter::default();
        let scheduler = RecordingScheduler::default();
        let job = FetchRegisterJob::new(client, &reporter, &scheduler);
        let result = job.run(store);
        let reports = reporter.reports.lock().unwrap().len();
        let enqueued = scheduler.enqueued.lock().unwrap().len();
        (result, reports, enqueued)
    }

    #[test]
    fn test_array_feed_creates_location() {
        let store = LocationStore::open_in_memory().unwrap();
        let (result, reports, _) = run_once(&StaticClient::new(ARRAY_FEED), &store);

        let report = result.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.created, 1);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(reports, 0);

        let location = store.find_by_code("GB").unwrap().unwrap();
        assert_eq!(location.code, "GB");
        assert_eq!(location.name, "United Kingdom");
        assert_eq!(location.start_date, NaiveDate::from_ymd_opt(1707, 5, 1));
        assert_eq!(location.end_date, NaiveDate::from_ymd_opt(2017, 12, 31));
    }

    #[test]
    fn test_map_feed_creates_identical_location() {
        let store = LocationStore::open_in_memory().unwrap();
        let (result, _, _) = run_once(&StaticClient::new(MAP_FEED), &store);

        assert_eq!(result.unwrap().created, 1);

        let location = store.find_by_code("GB").unwrap().unwrap();
        assert_eq!(location.name, "United Kingdom");
        assert_eq!(location.start_date, NaiveDate::from_ymd_opt(1707, 5, 1));
        assert_eq!(location.end_date, NaiveDate::from_ymd_opt(2017, 12, 31));
    }

    #[test]
    fn test_both_shapes_plan_identical_upserts() {
        assert_eq!(
            plan_sync(ARRAY_FEED.as_bytes()).unwrap(),
            plan_sync(MAP_FEED.as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_existing_location_is_updated_not_duplicated() {
        let store = LocationStore::open_in_memory().unwrap();
        store
            .insert(&LocationAttributes {
                code: "GB".to_string(),
                name: "Old Name".to_string(),
                start_date: None,
                end_date: None,
            })
            .unwrap();
        let backdated = Utc::now() - Duration::days(30);
        store.set_updated_at("GB", backdated).unwrap();

        let (result, _, _) = run_once(&StaticClient::new(ARRAY_FEED), &store);

        let report = result.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);
        assert_eq!(store.count().unwrap(), 1);

        let location = store.find_by_code("GB").unwrap().unwrap();
        assert_eq!(location.name, "United Kingdom");
        assert_eq!(location.start_date, NaiveDate::from_ymd_opt(1707, 5, 1));
        assert!(location.updated_at > backdated);
    }

    #[test]
    fn test_unchanged_location_keeps_updated_at() {
        let store = LocationStore::open_in_memory().unwrap();
        store
            .insert(&LocationAttributes {
                code: "GB".to_string(),
                name: "United Kingdom".to_string(),
                start_date: None,
                end_date: None,
            })
            .unwrap();
        let backdated = Utc::now() - Duration::days(30);
        store.set_updated_at("GB", backdated).unwrap();

        let (result, _, _) = run_once(&StaticClient::new(UNCHANGED_FEED), &store);

        assert_eq!(result.unwrap().unchanged, 1);
        let location = store.find_by_code("GB").unwrap().unwrap();
        assert_eq!(location.updated_at, backdated);
    }

    #[test]
    fn test_running_twice_is_idempotent() {
        let store = LocationStore::open_in_memory().unwrap();
        let client = StaticClient::new(ARRAY_FEED);

        let (first, _, _) = run_once(&client, &store);
        assert_eq!(first.unwrap().created, 1);
        let after_first = store.all_locations().unwrap();

        let (second, _, _) = run_once(&client, &store);
        let report = second.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 1);

        // Identical state, timestamps included.
        assert_eq!(store.all_locations().unwrap(), after_first);
    }

    #[test]
    fn test_fetch_failure_reports_once_and_enqueues_nothing() {
        let store = LocationStore::open_in_memory().unwrap();
        let (result, reports, enqueued) = run_once(&FailingClient { status: 404 }, &store);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), "register_unavailable");
        assert_eq!(err.status(), Some(404));

        assert_eq!(reports, 1);
        assert_eq!(enqueued, 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_report_carries_error_kind_and_cause() {
        let store = LocationStore::open_in_memory().unwrap();
        let reporter = RecordingReporter::default();
        let scheduler = RecordingScheduler::default();
        let client = FailingClient { status: 404 };
        let job = FetchRegisterJob::new(&client, &reporter, &scheduler);

        assert!(job.run(&store).is_err());

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "register_unavailable");
        assert!(reports[0].1.contains("HTTP 404"));
    }

    #[test]
    fn test_malformed_feed_aborts_without_writes() {
        let store = LocationStore::open_in_memory().unwrap();
        let (result, reports, enqueued) = run_once(&StaticClient::new("\"not a feed\""), &store);

        assert_eq!(result.unwrap_err().kind(), "malformed_feed");
        assert_eq!(reports, 1);
        assert_eq!(enqueued, 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_bad_date_in_one_entry_fails_whole_run() {
        let store = LocationStore::open_in_memory().unwrap();
        let feed = r#"
        [
            {"entry": {"country": "AD", "name": "Andorra"}},
            {"entry": {"country": "GB", "name": "United Kingdom", "start-date": "May 1707"}}
        ]
        "#;
        let client = StaticClient::new(feed);
        let (result, reports, _) = run_once(&client, &store);

        assert_eq!(result.unwrap_err().kind(), "malformed_feed");
        assert_eq!(reports, 1);
        // Mapping is all-or-nothing: the valid sibling entry was not written.
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_success_reports_nothing() {
        let store = LocationStore::open_in_memory().unwrap();
        let (result, reports, _) = run_once(&StaticClient::new("[]"), &store);

        assert_eq!(result.unwrap(), SyncReport::default());
        assert_eq!(reports, 0);
    }

    #[test]
    fn test_enqueue_defers_under_job_name() {
        let store = LocationStore::open_in_memory().unwrap();
        let client = StaticClient::new("[]");
        let reporter = RecordingReporter::default();
        let scheduler = RecordingScheduler::default();
        let job = FetchRegisterJob::new(&client, &reporter, &scheduler);

        job.enqueue();
        assert_eq!(
            *scheduler.enqueued.lock().unwrap(),
            vec![JOB_NAME.to_string()]
        );

        // A run after an explicit enqueue adds nothing further.
        let _ = job.run(&store);
        assert_eq!(scheduler.enqueued.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_multi_record_feed_mixes_outcomes() {
        let store = LocationStore::open_in_memory().unwrap();
        store
            .insert(&LocationAttributes {
                code: "AD".to_string(),
                name: "Andorra".to_string(),
                start_date: None,
                end_date: None,
            })
            .unwrap();

        let feed = r#"
        {
            "AD": {"country": "AD", "name": "Andorra"},
            "GB": {"country": "GB", "name": "United Kingdom"},
            "VA": {"country": "VA", "name": "Vatican City"}
        }
        "#;
        let client = StaticClient::new(feed);
        let (result, _, _) = run_once(&client, &store);

        let report = result.unwrap();
        assert_eq!(report.fetched, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.unchanged, 1);
        assert_eq!(store.count().unwrap(), 3);
    }
}
