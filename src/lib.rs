//! # Prompt Sweep
//!
//! Batch-dispatches a set of research queries to AI answer providers and
//! keeps a durable ledger of everything that failed, so a later retry run
//! can pick up exactly where the main run left off.
//!
//! ## Architecture
//!
//! The system is layered; each layer only calls downward:
//!
//! ### ① Providers
//! - `providers/` - one gateway per AI backend behind [`ProviderGateway`]
//! - `PerplexityGateway` - OpenAI-compatible chat completions
//! - `GeminiGateway` - `generateContent` with Google Search grounding
//! - `ProviderRegistry` - deterministic query-to-provider assignment
//!
//! ### ② Services
//! - `services/` - single-purpose capabilities, no flow knowledge
//! - `QuerySource` - reads the TOML work set
//! - `AnswerSink` - appends successful answers as JSONL
//!
//! ### ③ Workflow
//! - `workflow/` - the complete path of one query
//! - `QueryCtx` - position context for log lines
//! - `QueryFlow` - ask the gateway, log the answer, classify the failure
//!
//! ### ④ Orchestration
//! - `orchestrator/batch_scheduler` - batches, worker cap, accounting
//! - `orchestrator/app` - run modes, work set collection, ledger lifecycle
//!
//! Cutting across the layers, [`FailureLedger`] is the only state that
//! survives between runs: every query whose most recent attempt failed,
//! with its attempt count and last error.
//!
//! ## Binaries
//!
//! - `main_run` - dispatch the full query source
//! - `retry_run` - re-dispatch only the ledger's eligible entries
//!
//! [`ProviderGateway`]: providers::ProviderGateway
//! [`FailureLedger`]: ledger::FailureLedger

pub mod config;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::{Config, ProviderStrategy};
pub use error::{ProviderError, QueryErrorKind, SweepError, SweepResult};
pub use ledger::{FailureLedger, LedgerEntry};
pub use models::{AttemptOutcome, ProviderAnswer, Query, QueryKey, RunMode, RunSummary};
pub use orchestrator::{App, BatchScheduler};
pub use providers::{ProviderGateway, ProviderId, ProviderRegistry};
pub use services::{AnswerRecord, AnswerSink, QuerySource};
pub use workflow::{QueryCtx, QueryFlow};
