// Error taxonomy for register synchronization
// Every abort path carries exactly one of these to the error reporter.

use thiserror::Error;

/// Errors surfaced by a register sync run.
///
/// `RegisterUnavailable` covers non-200 responses and transport failures;
/// `MalformedFeed` covers unparseable JSON, unrecognized wire shapes,
/// missing required fields and invalid dates; `Store` wraps persistence
/// failures. None of these are retried inside a run - the surrounding
/// queue owns retry policy.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The register endpoint could not be reached or answered non-200.
    #[error("country register unavailable: {message}")]
    RegisterUnavailable {
        /// HTTP status when the server answered, `None` on transport errors.
        status: Option<u16>,
        message: String,
    },

    /// The feed body could not be normalized into register records.
    #[error("malformed register feed: {reason}")]
    MalformedFeed { reason: String },

    /// The location store failed underneath the reconciler.
    #[error("location store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl SyncError {
    pub fn unavailable(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::RegisterUnavailable {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        SyncError::MalformedFeed {
            reason: reason.into(),
        }
    }

    /// Short error kind for structured reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::RegisterUnavailable { .. } => "register_unavailable",
            SyncError::MalformedFeed { .. } => "malformed_feed",
            SyncError::Store(_) => "store",
        }
    }

    /// HTTP status attached to the failure, if the register answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::RegisterUnavailable { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SyncError::unavailable(Some(404), "register returned HTTP 404").kind(),
            "register_unavailable"
        );
        assert_eq!(SyncError::malformed("bad shape").kind(), "malformed_feed");
        assert_eq!(
            SyncError::Store(rusqlite::Error::QueryReturnedNoRows).kind(),
            "store"
        );
    }

    #[test]
    fn test_status_only_on_unavailable() {
        assert_eq!(
            SyncError::unavailable(Some(404), "not found").status(),
            Some(404)
        );
        assert_eq!(SyncError::unavailable(None, "connection refused").status(), None);
        assert_eq!(SyncError::malformed("bad date").status(), None);
    }

    #[test]
    fn test_display_carries_cause() {
        let err = SyncError::unavailable(Some(503), "register returned HTTP 503");
        assert_eq!(
            err.to_string(),
            "country register unavailable: register returned HTTP 503"
        );

        let err = SyncError::malformed("expected array or object at top level");
        assert!(err.to_string().contains("malformed register feed"));
    }
}
