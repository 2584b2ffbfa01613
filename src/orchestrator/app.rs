//! Application assembly and run lifecycle.
//!
//! ## Responsibilities
//!
//! 1. **Initialization**: validate the configuration and wire registry,
//!    sink, flow and scheduler together.
//! 2. **Work set collection**: the query source for a main run, eligible
//!    ledger entries for a retry run.
//! 3. **Ledger lifecycle**: load at start, hand to the scheduler, persist
//!    at the end. Persistence failures surface after the summary banner so
//!    completed work is still visible.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::SweepResult;
use crate::ledger::FailureLedger;
use crate::models::{Query, RunMode, RunSummary};
use crate::orchestrator::batch_scheduler::BatchScheduler;
use crate::providers::ProviderRegistry;
use crate::services::{AnswerSink, QuerySource};
use crate::utils::logging::{log_retry_recap, log_run_summary, log_startup, log_work_set};
use crate::workflow::QueryFlow;

pub struct App {
    config: Config,
    registry: Arc<ProviderRegistry>,
    scheduler: BatchScheduler,
}

impl App {
    /// Validate the configuration and wire up the run pipeline.
    pub fn initialize(config: Config) -> SweepResult<Self> {
        config.validate()?;

        let registry = Arc::new(ProviderRegistry::from_config(&config)?);
        let sink = Arc::new(AnswerSink::new(&config.answer_log_file));
        let flow = Arc::new(QueryFlow::new(sink));
        let scheduler = BatchScheduler::new(&config, Arc::clone(&registry), flow);

        Ok(Self {
            config,
            registry,
            scheduler,
        })
    }

    /// Execute one full run in the given mode and return its summary.
    pub async fn run(&self, mode: RunMode) -> SweepResult<RunSummary> {
        log_startup(
            mode,
            self.config.max_workers,
            self.config.batch_size,
            &self.registry.ids(),
        );

        let ledger = self.load_ledger(mode)?;
        let work_set = self.collect_work_set(mode, &ledger)?;

        if work_set.is_empty() {
            match mode {
                RunMode::Main => warn!("⚠️ The query source is empty, nothing to dispatch"),
                RunMode::Retry => info!("✓ No ledger entries eligible for retry, nothing to do"),
            }
            return Ok(RunSummary::empty(mode));
        }

        log_work_set(mode, work_set.len(), self.config.batch_pause_secs);

        let (summary, ledger) = self.scheduler.run(mode, work_set, ledger).await;

        log_run_summary(&summary, ledger.len(), ledger.terminal_count());
        if mode == RunMode::Retry {
            log_retry_recap(&summary);
        }

        if let Err(e) = ledger.save() {
            error!("❌ Failed to persist the ledger: {}", e);
            return Err(e);
        }
        info!(
            "💾 Ledger saved: {} ({} entries)",
            ledger.path().display(),
            ledger.len()
        );

        Ok(summary)
    }

    /// Load the durable ledger.
    ///
    /// A retry run's whole work set lives in the ledger, so an unreadable
    /// one is fatal there. A main run starts fresh instead, loudly.
    fn load_ledger(&self, mode: RunMode) -> SweepResult<FailureLedger> {
        match FailureLedger::load(&self.config.ledger_file, self.config.max_retries) {
            Ok(ledger) => Ok(ledger),
            Err(e) => match mode {
                RunMode::Retry => Err(e),
                RunMode::Main => {
                    warn!("⚠️ Ledger unreadable, starting fresh: {}", e);
                    Ok(FailureLedger::empty(
                        &self.config.ledger_file,
                        self.config.max_retries,
                    ))
                }
            },
        }
    }

    fn collect_work_set(&self, mode: RunMode, ledger: &FailureLedger) -> SweepResult<Vec<Query>> {
        match mode {
            RunMode::Main => {
                info!("\n📁 Loading queries from {}...", self.config.query_file);
                QuerySource::new(&self.config.query_file).fetch_queries()
            }
            RunMode::Retry => {
                let eligible = ledger.entries_eligible_for_retry(self.config.max_retries);
                let terminal = ledger.terminal_count();
                if terminal > 0 {
                    info!("⏭️ Skipping {} terminal entries, retry budget exhausted", terminal);
                }
                Ok(eligible.into_iter().map(|e| e.query.clone()).collect())
            }
        }
    }
}
