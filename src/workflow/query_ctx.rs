//! Per-query dispatch context.
//!
//! Carries "which query out of how many" so every log line locates itself
//! in the run.

use std::fmt::Display;

#[derive(Debug, Clone, Copy)]
pub struct QueryCtx {
    /// 1-based position in the run's work set. Log display only.
    pub position: usize,

    /// Total queries in the work set.
    pub total: usize,
}

impl QueryCtx {
    pub fn new(position: usize, total: usize) -> Self {
        Self { position, total }
    }
}

impl Display for QueryCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[query {}/{}]", self.position, self.total)
    }
}
