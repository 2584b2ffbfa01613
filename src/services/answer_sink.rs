//! Answer sink.
//!
//! Every successful answer is appended to a JSONL file, one self-contained
//! record per line. Appends are best effort: losing a log line is logged
//! loudly but never turns a successful query into a failed one.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::models::{ProviderAnswer, Query};
use crate::providers::ProviderId;

/// One logged answer, carrying the query metadata the reporting side
/// groups by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub timestamp: DateTime<Utc>,
    /// Calendar day of the attempt, for day-level grouping downstream.
    pub date: String,
    pub query: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub product: String,
    pub persona: String,
    pub provider: ProviderId,
    pub answer: String,
    pub citations: Vec<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl AnswerRecord {
    pub fn new(
        query: &Query,
        provider: ProviderId,
        answer: &ProviderAnswer,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            date: timestamp.format("%Y-%m-%d").to_string(),
            query: query.text.clone(),
            category: query.category.clone(),
            kind: query.kind.clone(),
            product: query.product.clone(),
            persona: query.persona.clone(),
            provider,
            answer: answer.text.clone(),
            citations: answer.citations.clone(),
            prompt_tokens: answer.prompt_tokens,
            completion_tokens: answer.completion_tokens,
        }
    }
}

pub struct AnswerSink {
    path: PathBuf,
}

impl AnswerSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record. Failures are swallowed after a warning.
    pub fn append(&self, record: &AnswerRecord) {
        if let Err(e) = self.try_append(record) {
            warn!("⚠️ Failed to append answer record to {}: {}", self.path.display(), e);
        }
    }

    fn try_append(&self, record: &AnswerRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record(query_text: &str) -> AnswerRecord {
        let query = Query::new(query_text);
        let mut answer = ProviderAnswer::from_text("an answer");
        answer.citations = vec!["https://example.com".to_string()];
        answer.prompt_tokens = Some(10);
        AnswerRecord::new(&query, ProviderId::Gemini, &answer, Utc::now())
    }

    #[test]
    fn appends_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("answers.jsonl");
        let sink = AnswerSink::new(&path);

        sink.append(&sample_record("first"));
        sink.append(&sample_record("second"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AnswerRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.query, "first");
        assert_eq!(first.provider, ProviderId::Gemini);
        assert_eq!(first.citations, vec!["https://example.com"]);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("answers.jsonl");
        let sink = AnswerSink::new(&path);

        sink.append(&sample_record("nested"));
        assert!(path.exists());
    }

    #[test]
    fn kind_serializes_as_type() {
        let json = serde_json::to_string(&sample_record("q")).unwrap();
        assert!(json.contains(r#""type":"Unspecified""#));
    }

    #[test]
    fn date_column_matches_the_attempt_day() {
        let ts = "2026-03-01T22:15:00Z".parse::<DateTime<Utc>>().unwrap();
        let record = AnswerRecord::new(
            &Query::new("q"),
            ProviderId::Perplexity,
            &ProviderAnswer::from_text("a"),
            ts,
        );
        assert_eq!(record.date, "2026-03-01");
    }
}
