//! Perplexity gateway.
//!
//! Perplexity exposes an OpenAI-compatible chat completions API, so this
//! gateway drives it with `async-openai` pointed at the Perplexity endpoint
//! and a `sonar` family model. Each query goes out as a single user
//! message; the answer is the first choice's message content.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{ProviderError, QueryErrorKind};
use crate::models::{ProviderAnswer, Query};
use crate::providers::{classify_detail, ProviderGateway, ProviderId};

pub struct PerplexityGateway {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl PerplexityGateway {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.perplexity_api_key)
            .with_api_base(&config.perplexity_api_base);

        // The client re-attempts 429s with exponential backoff on its own
        // unless told otherwise. Retries live at the run level here, so the
        // first rate-limit response must come back as RateLimited.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Self {
            client: Client::with_config(openai_config).with_backoff(no_retry),
            model: config.perplexity_model.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    async fn complete(&self, query: &Query) -> Result<ProviderAnswer, ProviderError> {
        let build_err = |e: OpenAIError| {
            ProviderError::new(QueryErrorKind::Unknown, format!("request build failed: {}", e))
        };

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(query.text.as_str())
            .build()
            .map_err(build_err)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .build()
            .map_err(build_err)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            let detail = e.to_string();
            ProviderError::new(classify_detail(&detail), detail)
        })?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                ProviderError::new(
                    QueryErrorKind::MalformedResponse,
                    "response carried no message content",
                )
            })?;

        let mut answer = ProviderAnswer::from_text(text.trim());
        if let Some(usage) = response.usage {
            answer.prompt_tokens = Some(usage.prompt_tokens);
            answer.completion_tokens = Some(usage.completion_tokens);
        }
        Ok(answer)
    }
}

#[async_trait]
impl ProviderGateway for PerplexityGateway {
    fn id(&self) -> ProviderId {
        ProviderId::Perplexity
    }

    async fn ask(&self, query: &Query) -> Result<ProviderAnswer, ProviderError> {
        debug!("Perplexity request, model: {}", self.model);

        match tokio::time::timeout(self.timeout, self.complete(query)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(self.timeout.as_secs())),
        }
    }
}
