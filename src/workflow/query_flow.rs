//! Single-query flow.
//!
//! The complete path of one dispatched query: ask the chosen gateway, log
//! the answer, classify any failure. The flow holds no shared run state;
//! the scheduler hands it a query and folds the returned outcome into the
//! tally and the ledger.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::QueryErrorKind;
use crate::models::{AttemptOutcome, Query};
use crate::providers::ProviderGateway;
use crate::services::{AnswerRecord, AnswerSink};
use crate::utils::truncate_text;
use crate::workflow::query_ctx::QueryCtx;

pub struct QueryFlow {
    sink: Arc<AnswerSink>,
}

impl QueryFlow {
    pub fn new(sink: Arc<AnswerSink>) -> Self {
        Self { sink }
    }

    /// Dispatch one query and classify the result.
    ///
    /// Always produces exactly one outcome. Provider errors become
    /// `Failure` outcomes rather than early returns, so the caller can
    /// account for every dispatched query.
    pub async fn run(
        &self,
        gateway: Arc<dyn ProviderGateway>,
        query: &Query,
        ctx: &QueryCtx,
    ) -> AttemptOutcome {
        let provider = gateway.id();
        info!("{} ▶️ \"{}\" → {}", ctx, truncate_text(&query.text, 60), provider);

        match gateway.ask(query).await {
            Ok(answer) => {
                let timestamp = Utc::now();
                info!(
                    "{} ✅ {} answered: {} chars, {} citations",
                    ctx,
                    provider,
                    answer.text.len(),
                    answer.citations.len()
                );

                self.sink
                    .append(&AnswerRecord::new(query, provider, &answer, timestamp));

                AttemptOutcome::Success {
                    answer,
                    provider,
                    timestamp,
                }
            }
            Err(e) => {
                let timestamp = Utc::now();
                // Auth failures poison every query routed to the provider,
                // so they get a louder line than ordinary failures.
                if e.kind == QueryErrorKind::AuthError {
                    error!("{} 🔑 {} rejected our credentials: {}", ctx, provider, e.detail);
                } else {
                    warn!(
                        "{} ❌ {} failed ({}): {}",
                        ctx,
                        provider,
                        e.kind,
                        truncate_text(&e.detail, 120)
                    );
                }

                AttemptOutcome::Failure {
                    kind: e.kind,
                    provider,
                    timestamp,
                    detail: e.detail,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::ProviderAnswer;
    use crate::providers::ProviderId;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedGateway {
        id: ProviderId,
        result: Result<String, QueryErrorKind>,
    }

    #[async_trait]
    impl ProviderGateway for FixedGateway {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn ask(&self, _query: &Query) -> Result<ProviderAnswer, ProviderError> {
            match &self.result {
                Ok(text) => Ok(ProviderAnswer::from_text(text.clone())),
                Err(kind) => Err(ProviderError::new(*kind, "simulated")),
            }
        }
    }

    fn flow_in(dir: &TempDir) -> (QueryFlow, std::path::PathBuf) {
        let path = dir.path().join("answers.jsonl");
        (QueryFlow::new(Arc::new(AnswerSink::new(&path))), path)
    }

    #[tokio::test]
    async fn success_is_logged_and_returned() {
        let dir = TempDir::new().unwrap();
        let (flow, sink_path) = flow_in(&dir);
        let gateway = Arc::new(FixedGateway {
            id: ProviderId::Perplexity,
            result: Ok("the answer".to_string()),
        });

        let outcome = flow
            .run(gateway, &Query::new("q"), &QueryCtx::new(1, 1))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.provider(), ProviderId::Perplexity);

        let logged = std::fs::read_to_string(&sink_path).unwrap();
        assert_eq!(logged.lines().count(), 1);
    }

    #[tokio::test]
    async fn failure_carries_the_classification() {
        let dir = TempDir::new().unwrap();
        let (flow, sink_path) = flow_in(&dir);
        let gateway = Arc::new(FixedGateway {
            id: ProviderId::Gemini,
            result: Err(QueryErrorKind::RateLimited),
        });

        let outcome = flow
            .run(gateway, &Query::new("q"), &QueryCtx::new(1, 1))
            .await;

        match outcome {
            AttemptOutcome::Failure { kind, provider, .. } => {
                assert_eq!(kind, QueryErrorKind::RateLimited);
                assert_eq!(provider, ProviderId::Gemini);
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // Failed attempts never reach the answer log.
        assert!(!sink_path.exists());
    }
}
