use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use supportflow_core::config::LlmConfig;
use supportflow_core::domain::embedding::EmbeddingVector;

use crate::llm::{CompletionOptions, LlmClient, ModelError};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama HTTP backend. Transport failures are retried, then surfaced; there is no
/// fallback to canned output.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    api_key: Option<SecretString>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ModelError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ModelError::Unavailable(format!("could not build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model().to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        })
    }

    /// Lists models the server reports through `GET /api/tags`.
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let url = format!("{}/api/tags", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = timeout(self.timeout, request.send())
            .await
            .map_err(|_| ModelError::Timeout(self.timeout))?
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(&url, status, &detail));
        }

        let tags: TagsResponse =
            response.json().await.map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        Ok(tags.models.into_iter().map(|entry| entry.name).collect())
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ModelError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let attempts = self.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            let outcome = match timeout(self.timeout, self.send_once(&url, body)).await {
                Ok(result) => result,
                Err(_) => Err(ModelError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(error) if error.is_retryable() && attempt < attempts => {
                    warn!(
                        event_name = "llm.request.retry",
                        url = %url,
                        attempt,
                        attempts,
                        error = %error,
                        "model request failed; retrying"
                    );
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send_once<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, ModelError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(self.timeout)
            } else {
                ModelError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(url, status, &detail));
        }

        response.json::<Resp>().await.map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }
}

/// Server errors are transient; any other status means the request itself was refused.
fn status_error(url: &str, status: StatusCode, detail: &str) -> ModelError {
    let message = format!("{url} returned {status}: {detail}");
    if status.is_server_error() {
        ModelError::Unavailable(message)
    } else {
        ModelError::InvalidResponse(message)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn backend(&self) -> &'static str {
        "ollama"
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ModelError> {
        debug!(
            event_name = "llm.complete.request",
            model = %self.model,
            temperature = options.temperature,
            max_tokens = options.max_tokens,
            prompt_chars = prompt.len(),
            "sending completion request"
        );
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let response: GenerateResponse = self.post_json("/api/generate", &request).await?;
        Ok(response.response)
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ModelError> {
        let request = EmbeddingRequest { model: &self.embedding_model, prompt: text };

        let response: EmbeddingResponse = self.post_json("/api/embeddings", &request).await?;
        EmbeddingVector::new(self.embedding_model.clone(), response.embedding)
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }
}
