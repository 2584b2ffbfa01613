//! Gemini gateway.
//!
//! Gemini has no OpenAI-compatible surface, so this gateway speaks the
//! `generateContent` REST API directly over `reqwest`, with Google Search
//! grounding enabled. Citations come back as grounding chunks and token
//! counts ride along in `usageMetadata`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{ProviderError, QueryErrorKind};
use crate::models::{ProviderAnswer, Query};
use crate::providers::{ProviderGateway, ProviderId};
use crate::utils::truncate_text;

pub struct GeminiGateway {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

// ========== Response wire types ==========
// Only the fields the gateway reads; everything else is ignored.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

impl GeminiGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.gemini_api_base.trim_end_matches('/').to_string(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    async fn generate(&self, query: &Query) -> Result<ProviderAnswer, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let payload = json!({
            "contents": [{ "parts": [{ "text": query.text }] }],
            "tools": [{ "google_search": {} }],
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: GenerateContentResponse =
            response.json().await.map_err(classify_body_error)?;

        extract_answer(body)
    }
}

#[async_trait]
impl ProviderGateway for GeminiGateway {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn ask(&self, query: &Query) -> Result<ProviderAnswer, ProviderError> {
        debug!("Gemini request, model: {}", self.model);
        self.generate(query).await
    }
}

fn classify_transport(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::new(QueryErrorKind::Timeout, e.to_string())
    } else {
        ProviderError::new(QueryErrorKind::Unknown, e.to_string())
    }
}

/// A body read can fail because the connection stalled, not only because
/// the bytes were bad. Timeouts keep their transport classification; only
/// genuine decode failures count as malformed.
fn classify_body_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        classify_transport(e)
    } else {
        ProviderError::new(
            QueryErrorKind::MalformedResponse,
            format!("failed to deserialize response: {}", e),
        )
    }
}

fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => QueryErrorKind::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => QueryErrorKind::AuthError,
        _ => QueryErrorKind::Unknown,
    };
    ProviderError::new(kind, format!("HTTP {}: {}", status, truncate_text(body, 300)))
}

/// Pull the answer text, citations and token counts out of a successful
/// response. A candidate with no text is treated as malformed, matching
/// what the API produces when generation is blocked.
fn extract_answer(response: GenerateContentResponse) -> Result<ProviderAnswer, ProviderError> {
    let GenerateContentResponse {
        candidates,
        usage_metadata,
    } = response;

    let candidate = candidates.into_iter().next().ok_or_else(|| {
        ProviderError::new(QueryErrorKind::MalformedResponse, "no candidates in response")
    })?;

    let text = candidate
        .content
        .unwrap_or_default()
        .parts
        .into_iter()
        .find_map(|part| part.text)
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ProviderError::new(
            QueryErrorKind::MalformedResponse,
            "candidate carried no text",
        ));
    }

    let citations = candidate
        .grounding_metadata
        .map(|g| g.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web.and_then(|w| w.uri))
        .collect();

    let (prompt_tokens, completion_tokens) = match usage_metadata {
        Some(usage) => (usage.prompt_token_count, usage.candidates_token_count),
        None => (None, None),
    };

    Ok(ProviderAnswer {
        text,
        citations,
        prompt_tokens,
        completion_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_citations_and_tokens() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Rust is a systems language." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://example.com/rust" } },
                        { "web": {} },
                        {}
                    ]
                }
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 84 }
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let answer = extract_answer(response).unwrap();

        assert_eq!(answer.text, "Rust is a systems language.");
        assert_eq!(answer.citations, vec!["https://example.com/rust"]);
        assert_eq!(answer.prompt_tokens, Some(12));
        assert_eq!(answer.completion_tokens, Some(84));
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        let err = extract_answer(response).unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::MalformedResponse);
    }

    #[test]
    fn empty_text_is_malformed() {
        let raw = r#"{ "candidates": [{ "content": { "parts": [{}] } }] }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let err = extract_answer(response).unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::MalformedResponse);
    }

    #[test]
    fn answer_without_grounding_has_no_citations() {
        let raw = r#"{ "candidates": [{ "content": { "parts": [{ "text": "plain answer" }] } }] }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let answer = extract_answer(response).unwrap();

        assert!(answer.citations.is_empty());
        assert_eq!(answer.prompt_tokens, None);
    }

    #[test]
    fn status_codes_map_onto_the_taxonomy() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down").kind,
            QueryErrorKind::RateLimited
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, "bad key").kind,
            QueryErrorKind::AuthError
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "oops").kind,
            QueryErrorKind::Unknown
        );
    }

    #[tokio::test]
    async fn a_stalled_body_read_keeps_its_timeout_classification() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let err = reqwest::Client::new()
            .get(server.uri())
            .timeout(Duration::from_millis(50))
            .send()
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(classify_body_error(err).kind, QueryErrorKind::Timeout);
    }

    #[tokio::test]
    async fn an_undecodable_body_is_malformed() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = reqwest::Client::new()
            .get(server.uri())
            .send()
            .await
            .unwrap()
            .json::<GenerateContentResponse>()
            .await
            .unwrap_err();

        assert!(!err.is_timeout());
        assert_eq!(
            classify_body_error(err).kind,
            QueryErrorKind::MalformedResponse
        );
    }
}
