//! Ollama-backed translation and summarization.
//!
//! Both stages issue non-streaming requests to `/api/generate`. One client serves both traits;
//! it carries no per-request state and can be called from many chunk workers at once.

use super::{InferenceError, SummaryBounds, Summarizer, Translator};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

const DETERMINISTIC_SEED: u64 = 42;

/// HTTP client for a local Ollama runtime.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    translation_model: String,
    summarization_model: String,
    source_language: String,
    target_language: String,
}

impl OllamaClient {
    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .user_agent("pdf-digest/inference")
            .build()
            .map_err(|error| {
                InferenceError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            http,
            base_url: config.ollama_url.clone(),
            translation_model: config.translation_model.clone(),
            summarization_model: config.summarization_model.clone(),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn translation_prompt(&self, text: &str) -> String {
        format!(
            "Translate the following text from '{}' to '{}'. Return only the translation, without commentary.\n\n{}",
            self.source_language, self.target_language, text
        )
    }

    fn summary_prompt(&self, text: &str, bounds: SummaryBounds) -> String {
        format!(
            "Summarize the following text in '{}'. Write between {} and {} words as a single paragraph. Do not add facts that are not in the text.\n\n{}",
            self.target_language, bounds.min_length, bounds.max_length, text
        )
    }

    async fn generate(
        &self,
        model: &str,
        prompt: String,
        options: Value,
    ) -> Result<String, InferenceError> {
        let payload = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": options,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                InferenceError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(InferenceError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            InferenceError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(InferenceError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        let text = body.response.trim();
        if text.is_empty() {
            return Err(InferenceError::InvalidResponse(
                "Ollama returned an empty completion".into(),
            ));
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl Translator for OllamaClient {
    async fn translate(&self, text: &str) -> Result<String, InferenceError> {
        let options = json!({
            "temperature": 0.0,
            "seed": DETERMINISTIC_SEED,
        });
        self.generate(&self.translation_model, self.translation_prompt(text), options)
            .await
    }
}

#[async_trait]
impl Summarizer for OllamaClient {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, InferenceError> {
        // Word bounds in the prompt; the token cap leaves headroom for multi-token words.
        let mut options = json!({ "num_predict": bounds.max_length * 2 });
        if bounds.deterministic {
            options["temperature"] = json!(0.0);
            options["seed"] = json!(DETERMINISTIC_SEED);
        }
        self.generate(
            &self.summarization_model,
            self.summary_prompt(text, bounds),
            options,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> OllamaClient {
        let config = Config {
            ollama_url: server.base_url(),
            translation_model: "translate-model".into(),
            summarization_model: "summary-model".into(),
            ..Config::default()
        };
        OllamaClient::from_config(&config).expect("client")
    }

    #[tokio::test]
    async fn translate_posts_to_generate_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("translate-model")
                    .body_contains("Hello world");
                then.status(200).json_body(json!({
                    "response": "  Ahoj světe \n",
                    "done": true
                }));
            })
            .await;

        let translated = client_for(&server)
            .translate("Hello world")
            .await
            .expect("translation");

        mock.assert_async().await;
        assert_eq!(translated, "Ahoj světe");
    }

    #[tokio::test]
    async fn summarize_sends_deterministic_options() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("summary-model")
                    .body_contains("\"num_predict\":500")
                    .body_contains("\"seed\":42");
                then.status(200).json_body(json!({
                    "response": "Short summary",
                    "done": true
                }));
            })
            .await;

        let summary = client_for(&server)
            .summarize("Long text", SummaryBounds::new(250, 100))
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Short summary");
    }

    #[tokio::test]
    async fn error_status_maps_to_generation_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client_for(&server)
            .translate("text")
            .await
            .expect_err("error response");

        assert!(matches!(error, InferenceError::GenerationFailed(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn incomplete_response_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "partial",
                    "done": false
                }));
            })
            .await;

        let error = client_for(&server)
            .summarize("text", SummaryBounds::default())
            .await
            .expect_err("incomplete response");

        assert!(matches!(error, InferenceError::InvalidResponse(_)));
    }
}
