pub mod outcome;
pub mod query;
pub mod summary;

pub use outcome::{AttemptOutcome, ProviderAnswer};
pub use query::{Query, QueryKey};
pub use summary::{RunMode, RunSummary};
