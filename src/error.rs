use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run-level errors.
///
/// Everything here aborts (or taints) a whole run. Per-query failures are
/// never represented as `SweepError`; they become [`AttemptOutcome::Failure`]
/// records and the run keeps going.
///
/// [`AttemptOutcome::Failure`]: crate::models::AttemptOutcome
#[derive(Debug, Error)]
pub enum SweepError {
    /// The query source file is missing, unreadable, or malformed.
    /// Fatal: aborts the run before any dispatch.
    #[error("query source unavailable ({path}): {detail}")]
    SourceUnavailable { path: String, detail: String },

    /// The failure ledger exists but cannot be parsed.
    /// Fatal for retry runs; main runs downgrade this to a warning and
    /// start from an empty ledger.
    #[error("failure ledger corrupt ({path}): {detail}")]
    LedgerCorrupt { path: String, detail: String },

    /// Writing the failure ledger back to disk failed. The run's query
    /// processing already finished; this is surfaced separately so the
    /// operator knows the durable ledger may be stale.
    #[error("failed to persist failure ledger ({path}): {detail}")]
    Persistence { path: String, detail: String },

    /// Invalid configuration, rejected before anything runs.
    #[error("invalid configuration: {0}")]
    Config(String),
}

// ========== Per-query errors ==========

/// Classification of a failed provider call.
///
/// Recorded in the failure ledger and counted in the run summary; none of
/// these abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    /// Provider said to slow down (HTTP 429).
    RateLimited,
    /// The call exceeded the per-request timeout.
    Timeout,
    /// Credentials rejected (HTTP 401/403). Usually means every later call
    /// to the same provider will fail too, so this is logged loudly.
    AuthError,
    /// The provider answered but the body could not be interpreted.
    MalformedResponse,
    /// Anything else (server errors, connection resets, ...).
    Unknown,
}

impl std::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QueryErrorKind::RateLimited => "rate limited",
            QueryErrorKind::Timeout => "timeout",
            QueryErrorKind::AuthError => "auth error",
            QueryErrorKind::MalformedResponse => "malformed response",
            QueryErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A classified provider-call failure.
#[derive(Debug, Error)]
#[error("{kind}: {detail}")]
pub struct ProviderError {
    pub kind: QueryErrorKind,
    pub detail: String,
}

impl ProviderError {
    pub fn new(kind: QueryErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(secs: u64) -> Self {
        Self::new(
            QueryErrorKind::Timeout,
            format!("no response within {}s", secs),
        )
    }
}

/// Result alias for run-level operations.
pub type SweepResult<T> = std::result::Result<T, SweepError>;
