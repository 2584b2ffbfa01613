//! Query source.
//!
//! The work set for a main run comes from a TOML document with one
//! `[[queries]]` table per query. The source is read once, up front; if it
//! cannot be read or parsed the run aborts before anything is dispatched,
//! so a broken source never shows up as a wall of provider failures.

use std::path::PathBuf;
use tracing::warn;

use crate::error::{SweepError, SweepResult};
use crate::models::Query;

#[derive(Debug, serde::Deserialize)]
struct QueryFile {
    #[serde(default)]
    queries: Vec<Query>,
}

pub struct QuerySource {
    path: PathBuf,
}

impl QuerySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the full work set.
    ///
    /// Rows with blank query text are skipped with a warning rather than
    /// dispatched as empty prompts.
    pub fn fetch_queries(&self) -> SweepResult<Vec<Query>> {
        let unavailable = |detail: String| SweepError::SourceUnavailable {
            path: self.path.display().to_string(),
            detail,
        };

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| unavailable(e.to_string()))?;
        let file: QueryFile = toml::from_str(&content).map_err(|e| unavailable(e.to_string()))?;

        let mut queries = Vec::new();
        for query in file.queries {
            if query.text.trim().is_empty() {
                warn!("⚠️ Skipping query row with blank text");
                continue;
            }
            queries.push(query);
        }

        Ok(queries)
    }
}
