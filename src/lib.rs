// Register Sync - Core Library
// Exposes all modules for use in the CLI and tests

pub mod error;
pub mod fetcher;
pub mod schema;
pub mod mapper;
pub mod store;
pub mod reconcile;
pub mod job;

// Re-export commonly used types
pub use error::SyncError;
pub use fetcher::{
    HttpRegisterClient, RegisterClient, DEFAULT_REGISTER_BASE_URL, REGISTER_PAGE_SIZE,
};
pub use schema::{parse_feed, ExternalRecord, Provenance, RegisterFeed};
pub use mapper::{map_record, map_records, LocationAttributes};
pub use store::{Location, LocationStore};
pub use reconcile::{changed_fields, reconcile_record, LocationField, Outcome, SyncReport};
pub use job::{
    plan_sync, ErrorReporter, FetchRegisterJob, JobScheduler, LogReporter, NullScheduler, JOB_NAME,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
