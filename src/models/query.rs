//! Query data model.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Display;

fn default_category() -> String {
    "General".to_string()
}

fn default_unspecified() -> String {
    "Unspecified".to_string()
}

/// A single prompt for an AI provider, with the categorical metadata the
/// reporting side groups answers by.
///
/// Immutable once fetched; the scheduler only reads it. Source rows may
/// omit any metadata column, in which case the field defaults apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_unspecified")]
    pub product: String,
    #[serde(rename = "type", default = "default_unspecified")]
    pub kind: String,
    #[serde(default = "default_unspecified")]
    pub persona: String,
}

impl Query {
    /// Build a query with default metadata. Mostly useful in tests.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: default_category(),
            product: default_unspecified(),
            kind: default_unspecified(),
            persona: default_unspecified(),
        }
    }

    /// Stable identity derived from the text plus every metadata field.
    ///
    /// Two queries with the same text but different personas are distinct
    /// work items and must not share a ledger entry.
    pub fn key(&self) -> QueryKey {
        let mut hasher = Sha256::new();
        for part in [
            &self.text,
            &self.category,
            &self.product,
            &self.kind,
            &self.persona,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        QueryKey(format!("{:x}", hasher.finalize()))
    }
}

/// Hex SHA-256 identity of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(pub String);

impl QueryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
