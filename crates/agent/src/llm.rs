use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use supportflow_core::config::LlmConfig;
use supportflow_core::domain::embedding::EmbeddingVector;

use crate::ollama::OllamaClient;
use crate::simulated::SimulatedClient;

/// Sampling knobs sent with a completion request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::new(0.7, 1000)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model backend unavailable: {0}")]
    Unavailable(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Transport failures are worth another attempt; undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    pub fn class(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "model_unavailable",
            Self::Timeout(_) => "model_timeout",
            Self::InvalidResponse(_) => "model_invalid_response",
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short backend label used in logs and the doctor report.
    fn backend(&self) -> &'static str;

    /// Model name stamped on every vector returned by `embed`.
    fn embedding_model(&self) -> &str;

    async fn complete(&self, prompt: &str, options: &CompletionOptions)
        -> Result<String, ModelError>;

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ModelError>;
}

/// Picks the simulated or HTTP backend from configuration.
pub fn client_from_config(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, ModelError> {
    if config.simulate {
        Ok(Arc::new(SimulatedClient::default()))
    } else {
        Ok(Arc::new(OllamaClient::from_config(config)?))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use supportflow_core::config::AppConfig;

    use super::{client_from_config, ModelError};

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(ModelError::Unavailable("refused".to_string()).is_retryable());
        assert!(ModelError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ModelError::InvalidResponse("not json".to_string()).is_retryable());
        assert_eq!(ModelError::Timeout(Duration::from_secs(1)).class(), "model_timeout");
    }

    #[test]
    fn simulate_flag_selects_simulated_backend() {
        let mut config = AppConfig::default().llm;
        config.simulate = true;
        let simulated = client_from_config(&config).expect("simulated client");

        config.simulate = false;
        let ollama = client_from_config(&config).expect("ollama client");

        assert_eq!(simulated.backend(), "simulated");
        assert_eq!(ollama.backend(), "ollama");
        assert_eq!(ollama.embedding_model(), "llama3");
    }
}
