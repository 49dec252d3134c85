// 🌐 Register Fetcher - one blocking GET per run
// The register is polled with a single synchronous request; any non-200
// answer or transport failure fails the run without retry. Retry policy
// belongs to the queue that schedules runs, not here.

use crate::error::SyncError;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_REGISTER_BASE_URL: &str = "https://country.register.gov.uk";

/// Upstream pagination size. 500 covers the whole register in one page.
pub const REGISTER_PAGE_SIZE: u32 = 500;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The network seam of the pipeline. Tests substitute canned or failing
/// implementations; production uses `HttpRegisterClient`.
pub trait RegisterClient: Send + Sync {
    /// Fetch the raw feed body. Only an HTTP 200 body counts as success.
    fn fetch_records(&self) -> Result<Vec<u8>, SyncError>;
}

/// Blocking HTTP client against the country register.
pub struct HttpRegisterClient {
    base_url: String,
    http_client: reqwest::blocking::Client,
}

impl HttpRegisterClient {
    /// Client against the production register endpoint.
    pub fn new() -> Result<Self, SyncError> {
        Self::with_base_url(DEFAULT_REGISTER_BASE_URL)
    }

    /// Client against an explicit base URL (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| {
                SyncError::unavailable(None, format!("failed to build HTTP client: {error}"))
            })?;

        Ok(HttpRegisterClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn records_url(&self) -> String {
        format!(
            "{}/records.json?page-size={}",
            self.base_url, REGISTER_PAGE_SIZE
        )
    }
}

impl RegisterClient for HttpRegisterClient {
    fn fetch_records(&self) -> Result<Vec<u8>, SyncError> {
        let url = self.records_url();
        debug!(%url, "fetching country register");

        let response = self.http_client.get(&url).send().map_err(|error| {
            SyncError::unavailable(
                error.status().map(|s| s.as_u16()),
                format!("request to {url} failed: {error}"),
            )
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SyncError::unavailable(
                Some(status.as_u16()),
                format!("register returned HTTP {status}"),
            ));
        }

        let body = response.bytes().map_err(|error| {
            SyncError::unavailable(None, format!("failed to read register body: {error}"))
        })?;

        Ok(body.to_vec())
    }
}
