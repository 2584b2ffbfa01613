use crate::error::{SweepError, SweepResult};

/// How the gateway picks a provider for a query when more than one is active.
///
/// Both variants are deterministic per query identity, so re-running the
/// same work set always reproduces the same provider assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderStrategy {
    /// A query is pinned to one provider for its whole lifetime; retries
    /// hit the same provider that originally failed.
    Affinity,
    /// Each cross-run retry advances to the next active provider.
    Rotate,
}

impl ProviderStrategy {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "rotate" => ProviderStrategy::Rotate,
            _ => ProviderStrategy::Affinity,
        }
    }
}

/// Program configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Worker pool size: max provider calls in flight across the whole run
    pub max_workers: usize,
    /// Queries dispatched per batch
    pub batch_size: usize,
    /// Cross-run attempts before a failed query is marked terminal
    pub max_retries: u32,
    /// Pause between batches (seconds, 0 = none)
    pub batch_pause_secs: u64,
    /// Per provider call timeout (seconds)
    pub request_timeout_secs: u64,
    /// Active provider names, lowercase
    pub active_providers: Vec<String>,
    /// Provider selection for multi-provider setups
    pub provider_strategy: ProviderStrategy,
    /// main_run exits nonzero above this failed/dispatched ratio
    pub fail_rate_threshold: f64,
    /// TOML file with the query set
    pub query_file: String,
    /// Durable failure ledger (JSON)
    pub ledger_file: String,
    /// Append-only answer log (JSONL)
    pub answer_log_file: String,
    // --- Perplexity ---
    pub perplexity_api_key: String,
    pub perplexity_api_base: String,
    pub perplexity_model: String,
    // --- Gemini ---
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 3,
            batch_size: 30,
            max_retries: 4,
            batch_pause_secs: 0,
            request_timeout_secs: 120,
            active_providers: vec!["perplexity".to_string(), "gemini".to_string()],
            provider_strategy: ProviderStrategy::Affinity,
            fail_rate_threshold: 0.3,
            query_file: "data/queries.toml".to_string(),
            ledger_file: "data/failed_queries.json".to_string(),
            answer_log_file: "data/answer_log.jsonl".to_string(),
            perplexity_api_key: String::new(),
            perplexity_api_base: "https://api.perplexity.ai".to_string(),
            perplexity_model: "sonar".to_string(),
            gemini_api_key: String::new(),
            gemini_api_base: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_workers: std::env::var("MAX_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_workers),
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            batch_pause_secs: std::env::var("BATCH_PAUSE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_pause_secs),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            active_providers: std::env::var("ACTIVE_PROVIDERS").map(|v| parse_provider_list(&v)).unwrap_or(default.active_providers),
            provider_strategy: std::env::var("PROVIDER_STRATEGY").map(|v| ProviderStrategy::parse(&v)).unwrap_or(default.provider_strategy),
            fail_rate_threshold: std::env::var("FAIL_RATE_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.fail_rate_threshold),
            query_file: std::env::var("QUERY_FILE").unwrap_or(default.query_file),
            ledger_file: std::env::var("LEDGER_FILE").unwrap_or(default.ledger_file),
            answer_log_file: std::env::var("ANSWER_LOG_FILE").unwrap_or(default.answer_log_file),
            perplexity_api_key: std::env::var("PERPLEXITY_API_KEY").unwrap_or(default.perplexity_api_key),
            perplexity_api_base: std::env::var("PERPLEXITY_API_BASE").unwrap_or(default.perplexity_api_base),
            perplexity_model: std::env::var("PERPLEXITY_MODEL").unwrap_or(default.perplexity_model),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.gemini_api_key),
            gemini_api_base: std::env::var("GEMINI_API_BASE").unwrap_or(default.gemini_api_base),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(default.gemini_model),
        }
    }

    /// Reject configurations the scheduler contract forbids, including an
    /// active provider with no credential to send. A missing key would turn
    /// every dispatched query into an AuthError ledger entry, so it is
    /// caught before anything runs.
    pub fn validate(&self) -> SweepResult<()> {
        if self.max_workers == 0 {
            return Err(SweepError::Config("max_workers must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(SweepError::Config("batch_size must be > 0".to_string()));
        }
        if self.max_retries == 0 {
            return Err(SweepError::Config("max_retries must be >= 1".to_string()));
        }
        if self.active_providers.is_empty() {
            return Err(SweepError::Config(
                "active_providers must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fail_rate_threshold) {
            return Err(SweepError::Config(
                "fail_rate_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        for provider in &self.active_providers {
            // Unknown names are rejected later, when the registry is built.
            let key = match provider.as_str() {
                "perplexity" => &self.perplexity_api_key,
                "gemini" => &self.gemini_api_key,
                _ => continue,
            };
            if key.trim().is_empty() {
                return Err(SweepError::Config(format!(
                    "missing API key for active provider '{}'",
                    provider
                )));
            }
        }
        Ok(())
    }
}

fn parse_provider_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys() -> Config {
        Config {
            perplexity_api_key: "test-key".to_string(),
            gemini_api_key: "test-key".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn default_config_with_keys_is_valid() {
        assert!(config_with_keys().validate().is_ok());
    }

    #[test]
    fn missing_key_for_active_provider_is_rejected() {
        // Defaults activate both providers but carry no credentials.
        assert!(Config::default().validate().is_err());

        let gemini_only = Config {
            active_providers: vec!["gemini".to_string()],
            gemini_api_key: "test-key".to_string(),
            ..Config::default()
        };
        assert!(gemini_only.validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers() {
        let config = Config {
            max_workers: 0,
            ..config_with_keys()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_provider_set() {
        let config = Config {
            active_providers: Vec::new(),
            ..config_with_keys()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_provider_list_with_spaces() {
        assert_eq!(
            parse_provider_list("Perplexity, Gemini"),
            vec!["perplexity".to_string(), "gemini".to_string()]
        );
    }

    #[test]
    fn unknown_strategy_falls_back_to_affinity() {
        assert_eq!(ProviderStrategy::parse("rotate"), ProviderStrategy::Rotate);
        assert_eq!(
            ProviderStrategy::parse("whatever"),
            ProviderStrategy::Affinity
        );
    }
}
