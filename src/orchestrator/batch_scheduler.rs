//! Batch scheduler - orchestration layer.
//!
//! ## Responsibilities
//!
//! 1. **Concurrency control**: one semaphore caps in-flight provider calls
//!    for the whole run, not per batch.
//! 2. **Batching**: queries are dispatched in fixed-size batches, with an
//!    optional pause between batches and none after the last.
//! 3. **Accounting**: every dispatched query lands in the shared run state
//!    exactly once, as a success or a failure.
//! 4. **Ledger maintenance**: a success clears the query's ledger entry, a
//!    failure upserts one, both under the same lock as the tally.
//!
//! ## Invariants
//!
//! - Batches gate dispatch, not completion. Outcomes are collected once,
//!   after the final batch has been handed to the workers.
//! - The state lock is a `std::sync::Mutex` and is never held across an
//!   await. All provider I/O happens in the flow before the lock is taken.
//! - Provider selection reads the ledger once, before any dispatch, so it
//!   depends only on query identity and the ledger as of run start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::error;

use crate::config::Config;
use crate::error::QueryErrorKind;
use crate::ledger::FailureLedger;
use crate::models::{AttemptOutcome, Query, QueryKey, RunMode, RunSummary};
use crate::providers::{ProviderId, ProviderRegistry};
use crate::utils::logging::log_batch_start;
use crate::utils::truncate_text;
use crate::workflow::{QueryCtx, QueryFlow};

/// Shared mutable run state. One lock covers both the tally and the
/// ledger, so a reader can never observe a success counted but not yet
/// cleared from the ledger.
#[derive(Debug, Clone)]
struct RunState {
    ledger: FailureLedger,
    succeeded: usize,
    failed: usize,
}

/// A poisoned lock still holds valid counts; recover the guard rather
/// than propagating a worker's panic into collection.
fn lock_state(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct BatchScheduler {
    registry: Arc<ProviderRegistry>,
    flow: Arc<QueryFlow>,
    max_workers: usize,
    batch_size: usize,
    batch_pause: Duration,
}

impl BatchScheduler {
    pub fn new(config: &Config, registry: Arc<ProviderRegistry>, flow: Arc<QueryFlow>) -> Self {
        Self {
            registry,
            flow,
            max_workers: config.max_workers,
            batch_size: config.batch_size,
            batch_pause: Duration::from_secs(config.batch_pause_secs),
        }
    }

    /// Dispatch the whole work set and fold every outcome into the ledger.
    ///
    /// Takes the ledger by value and returns the updated one alongside the
    /// summary; the caller decides when to persist it.
    pub async fn run(
        &self,
        mode: RunMode,
        queries: Vec<Query>,
        ledger: FailureLedger,
    ) -> (RunSummary, FailureLedger) {
        let started = Instant::now();
        let total = queries.len();

        if total == 0 {
            return (RunSummary::empty(mode), ledger);
        }

        // Attempt counts are snapshotted up front so provider selection
        // sees the ledger as of run start, not mid-run mutations.
        let prior_attempts: HashMap<QueryKey, u32> = queries
            .iter()
            .map(|q| {
                let key = q.key();
                let count = ledger.attempt_count(&key);
                (key, count)
            })
            .collect();

        let state = Arc::new(Mutex::new(RunState {
            ledger,
            succeeded: 0,
            failed: 0,
        }));
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let total_batches = (total + self.batch_size - 1) / self.batch_size;
        let mut handles: Vec<(Query, ProviderId, JoinHandle<()>)> = Vec::with_capacity(total);

        'dispatch: for batch_start in (0..total).step_by(self.batch_size) {
            let batch_end = (batch_start + self.batch_size).min(total);
            let batch_num = batch_start / self.batch_size + 1;

            log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);

            for (idx, query) in queries[batch_start..batch_end].iter().enumerate() {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    // The semaphore lives for this run and is never closed.
                    Err(_) => break 'dispatch,
                };

                let key = query.key();
                let prior = prior_attempts.get(&key).copied().unwrap_or(0);
                let gateway = self.registry.select(&key, prior);
                let provider = gateway.id();

                let ctx = QueryCtx::new(batch_start + idx + 1, total);
                let query_clone = query.clone();
                let flow = Arc::clone(&self.flow);
                let task_state = Arc::clone(&state);

                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = flow.run(gateway, &query_clone, &ctx).await;

                    let mut state = lock_state(&task_state);
                    match &outcome {
                        AttemptOutcome::Success { .. } => {
                            state.succeeded += 1;
                            state.ledger.record_success(&key);
                        }
                        AttemptOutcome::Failure {
                            kind,
                            provider,
                            timestamp,
                            detail,
                        } => {
                            state.failed += 1;
                            state.ledger.record_failure(
                                &query_clone,
                                *provider,
                                *kind,
                                detail.clone(),
                                *timestamp,
                            );
                        }
                    }
                });

                handles.push((query.clone(), provider, handle));
            }

            if batch_end < total && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        let dispatched = handles.len();

        // Collect every worker. A task that died before recording its
        // outcome still has to account for its query.
        for (query, provider, handle) in handles {
            if let Err(e) = handle.await {
                error!(
                    "❌ Worker for \"{}\" did not finish: {}",
                    truncate_text(&query.text, 40),
                    e
                );
                let mut state = lock_state(&state);
                state.failed += 1;
                state.ledger.record_failure(
                    &query,
                    provider,
                    QueryErrorKind::Unknown,
                    format!("worker task failed: {}", e),
                    Utc::now(),
                );
            }
        }

        // Every worker has been joined, so this is the last reference.
        let state = Arc::try_unwrap(state)
            .map(|mutex| mutex.into_inner().unwrap_or_else(|p| p.into_inner()))
            .unwrap_or_else(|shared| lock_state(&shared).clone());

        let summary = RunSummary {
            mode,
            dispatched,
            succeeded: state.succeeded,
            failed: state.failed,
            duration: started.elapsed(),
        };

        (summary, state.ledger)
    }
}
