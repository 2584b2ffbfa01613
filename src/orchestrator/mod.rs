//! Orchestration layer.
//!
//! ## Modules
//!
//! ### `batch_scheduler`
//! - Caps concurrency with one run-wide semaphore
//! - Dispatches queries in batches, pausing between them
//! - Folds every outcome into the tally and the failure ledger
//!
//! ### `app`
//! - Wires configuration, providers, sink, flow and scheduler together
//! - Picks the work set for the run mode
//! - Loads the ledger up front and persists it at run end
//!
//! ## Layering
//!
//! ```text
//! app (work set + ledger lifecycle)
//!     ↓
//! batch_scheduler (batches, workers, accounting)
//!     ↓
//! workflow::QueryFlow (one query end to end)
//!     ↓
//! services / providers (source, sink, gateways)
//! ```

pub mod app;
pub mod batch_scheduler;

pub use app::App;
pub use batch_scheduler::BatchScheduler;
