//! Per-attempt outcome types.

use crate::error::QueryErrorKind;
use crate::providers::ProviderId;
use chrono::{DateTime, Utc};

/// What a provider returned for one query.
#[derive(Debug, Clone, Default)]
pub struct ProviderAnswer {
    pub text: String,
    /// Source URLs cited by the provider, when it reports them.
    pub citations: Vec<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl ProviderAnswer {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// The single outcome of one (query, provider) attempt.
///
/// Produced exactly once per dispatched query and never mutated. Failures
/// carry the classification the ledger records.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Success {
        answer: ProviderAnswer,
        provider: ProviderId,
        timestamp: DateTime<Utc>,
    },
    Failure {
        kind: QueryErrorKind,
        provider: ProviderId,
        timestamp: DateTime<Utc>,
        detail: String,
    },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }

    pub fn provider(&self) -> ProviderId {
        match self {
            AttemptOutcome::Success { provider, .. } => *provider,
            AttemptOutcome::Failure { provider, .. } => *provider,
        }
    }
}
