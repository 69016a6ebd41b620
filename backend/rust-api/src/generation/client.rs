use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::utils::retry::FailureClass;

/// Phrases the upstream API uses when it is overloaded or throttling
const TRANSIENT_MARKERS: &[&str] = &[
    "503",
    "overloaded",
    "service unavailable",
    "429",
    "rate limit",
];

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GenerationError {
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Decides whether a generation failure should be retried.
pub fn classify(error: &GenerationError) -> FailureClass {
    let message = error.message.to_lowercase();
    if TRANSIENT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        FailureClass::Transient
    } else {
        FailureClass::Permanent
    }
}

/// External text generation collaborator
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Used when no API key is configured; every call fails permanently.
pub struct UnconfiguredGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::new(
            "Text generation API key is not configured",
        ))
    }
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    api_base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig, api_key: String) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            model: config.model.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url, self.model
        );

        let payload = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationParams {
                temperature: 0.7,
                max_output_tokens: 8192,
            },
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Calling text generation API");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::new(format!("Failed to call generation API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::new(format!(
                "Generation API returned error {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            GenerationError::new(format!("Failed to parse generation API response: {}", e))
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::new("Generation API returned no text"));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_and_rate_limit_are_transient() {
        for message in [
            "Generation API returned error 503 Service Unavailable: busy",
            "The model is overloaded. Please try again later.",
            "Service Unavailable",
            "429 Too Many Requests",
            "Rate limit exceeded",
        ] {
            assert_eq!(
                classify(&GenerationError::new(message)),
                FailureClass::Transient,
                "{}",
                message
            );
        }
    }

    #[test]
    fn other_failures_are_permanent() {
        for message in [
            "Generation API returned error 400 Bad Request: invalid argument",
            "API key not valid",
            "Text generation API key is not configured",
        ] {
            assert_eq!(
                classify(&GenerationError::new(message)),
                FailureClass::Permanent,
                "{}",
                message
            );
        }
    }

    #[tokio::test]
    async fn unconfigured_generator_fails_permanently() {
        let err = UnconfiguredGenerator.generate("prompt").await.unwrap_err();
        assert_eq!(classify(&err), FailureClass::Permanent);
    }
}
