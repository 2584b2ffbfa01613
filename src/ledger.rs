//! Durable failure ledger.
//!
//! The only state that survives across runs: every query whose most recent
//! attempt failed, with how often it has been tried and what went wrong.
//! Stored as a pretty-printed JSON array so an operator can diff it or eye
//! it directly; an empty array means all clear.
//!
//! The ledger is loaded at run start, mutated in memory under the batch
//! scheduler's lock, and written back atomically (temp file + rename) at
//! run end. Entries keep their insertion order, which is first-failure
//! order, so retry runs dispatch oldest failures first.

use crate::error::{QueryErrorKind, SweepError, SweepResult};
use crate::models::{Query, QueryKey};
use crate::providers::ProviderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Most recent failure recorded for an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastError {
    pub kind: QueryErrorKind,
    pub detail: String,
}

/// One outstanding failed query.
///
/// The full query payload is retained so retry runs never touch the query
/// source. `terminal` entries have exhausted their retry budget; they stay
/// in the file for visibility but are excluded from retry selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: QueryKey,
    pub query: Query,
    /// Provider of the most recent attempt.
    pub provider: ProviderId,
    pub attempt_count: u32,
    pub last_error: LastError,
    pub first_failed_at: DateTime<Utc>,
    pub last_attempted_at: DateTime<Utc>,
    #[serde(default)]
    pub terminal: bool,
}

/// Cross-run record of failed queries, keyed by query identity.
#[derive(Debug, Clone)]
pub struct FailureLedger {
    path: PathBuf,
    max_retries: u32,
    entries: Vec<LedgerEntry>,
}

impl FailureLedger {
    /// A ledger with no entries, bound to `path` for later saves.
    pub fn empty(path: impl Into<PathBuf>, max_retries: u32) -> Self {
        Self {
            path: path.into(),
            max_retries,
            entries: Vec::new(),
        }
    }

    /// Read the ledger from disk. An absent file is an empty ledger, not an
    /// error; a file that exists but cannot be read or parsed is
    /// [`SweepError::LedgerCorrupt`].
    pub fn load(path: impl Into<PathBuf>, max_retries: u32) -> SweepResult<Self> {
        let path = path.into();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::empty(path, max_retries));
            }
            Err(e) => {
                return Err(SweepError::LedgerCorrupt {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                });
            }
        };

        let entries: Vec<LedgerEntry> =
            serde_json::from_str(&content).map_err(|e| SweepError::LedgerCorrupt {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            path,
            max_retries,
            entries,
        })
    }

    /// Upsert the entry for `query`, incrementing its attempt count.
    /// Returns the new count. Once the count reaches the retry budget the
    /// entry is marked terminal but kept.
    pub fn record_failure(
        &mut self,
        query: &Query,
        provider: ProviderId,
        kind: QueryErrorKind,
        detail: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u32 {
        let key = query.key();
        let last_error = LastError {
            kind,
            detail: detail.into(),
        };

        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.attempt_count += 1;
            entry.provider = provider;
            entry.last_error = last_error;
            entry.last_attempted_at = now;
            if entry.attempt_count >= self.max_retries {
                entry.terminal = true;
            }
            return entry.attempt_count;
        }

        let entry = LedgerEntry {
            key,
            query: query.clone(),
            provider,
            attempt_count: 1,
            last_error,
            first_failed_at: now,
            last_attempted_at: now,
            terminal: 1 >= self.max_retries,
        };
        self.entries.push(entry);
        1
    }

    /// Clear the entry for a query that just succeeded. No-op when absent.
    pub fn record_success(&mut self, key: &QueryKey) {
        self.entries.retain(|e| &e.key != key);
    }

    /// Recorded attempts for a query, 0 when it has no entry.
    pub fn attempt_count(&self, key: &QueryKey) -> u32 {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map(|e| e.attempt_count)
            .unwrap_or(0)
    }

    /// Non-terminal entries still under the retry budget, oldest first.
    pub fn entries_eligible_for_retry(&self, max_retries: u32) -> Vec<&LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| !e.terminal && e.attempt_count < max_retries)
            .collect()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn terminal_count(&self) -> usize {
        self.entries.iter().filter(|e| e.terminal).count()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full current state to disk. Atomic from a reader's point
    /// of view: serialized to `<path>.tmp`, then renamed over the target.
    pub fn save(&self) -> SweepResult<()> {
        let persistence_err = |detail: String| SweepError::Persistence {
            path: self.path.display().to_string(),
            detail,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| persistence_err(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| persistence_err(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json).map_err(|e| persistence_err(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| persistence_err(e.to_string()))?;

        Ok(())
    }
}
