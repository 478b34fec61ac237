use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use supportflow_core::domain::embedding::EmbeddingVector;

use crate::llm::{CompletionOptions, LlmClient, ModelError};

pub const SIMULATED_MODEL: &str = "simulated";
pub const EMBEDDING_DIMENSION: usize = 10;

const FALLBACK_RESPONSE: &str = "I'm not sure how to respond to that prompt.";

const SUMMARY_RESPONSE: &str = "This is a simulated summary of the conversation. The customer was \
experiencing login issues with their account. The agent sent a password reset link to the \
customer's email, and the customer confirmed they would check their email.";

/// Canned responses the simulated backend can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CannedTask {
    Summarize,
    ExtractActions,
    Route,
    Recommend,
    PredictTime,
}

impl CannedTask {
    fn from_task_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "summarize" => Some(Self::Summarize),
            "extract_actions" => Some(Self::ExtractActions),
            "route" => Some(Self::Route),
            "recommend_resolution" => Some(Self::Recommend),
            "predict_time" => Some(Self::PredictTime),
            _ => None,
        }
    }

    /// A leading `task: <name>` line wins; otherwise keywords are checked in order.
    pub fn detect(prompt: &str) -> Option<Self> {
        let declared = prompt
            .lines()
            .next()
            .and_then(|line| line.trim().strip_prefix("task:"))
            .and_then(Self::from_task_label);
        if declared.is_some() {
            return declared;
        }

        let prompt = prompt.to_lowercase();
        let has_any = |needles: &[&str]| needles.iter().any(|needle| prompt.contains(needle));
        if prompt.contains("summarize") {
            Some(Self::Summarize)
        } else if has_any(&["action", "extract"]) {
            Some(Self::ExtractActions)
        } else if has_any(&["route", "team"]) {
            Some(Self::Route)
        } else if has_any(&["resolution", "recommend"]) {
            Some(Self::Recommend)
        } else if has_any(&["time", "predict"]) {
            Some(Self::PredictTime)
        } else {
            None
        }
    }

    fn response(self) -> String {
        match self {
            Self::Summarize => SUMMARY_RESPONSE.to_string(),
            Self::ExtractActions => json!({
                "action_items": [
                    {
                        "action": "Send password reset link to customer",
                        "priority": "High",
                        "status": "Completed"
                    },
                    {
                        "action": "Follow up with customer to confirm successful login",
                        "priority": "Medium",
                        "status": "Pending"
                    }
                ],
                "total_actions": 2
            })
            .to_string(),
            Self::Route => json!({
                "recommended_team": "Account Management",
                "confidence": "High",
                "justification": "This is an account access issue related to password problems.",
                "timestamp": "2023-06-15 10:15:00"
            })
            .to_string(),
            Self::Recommend => json!({
                "immediate_steps": [
                    {
                        "action": "Verify refund status",
                        "details": "Check if refund has been processed"
                    },
                    {
                        "action": "Send confirmation email",
                        "details": "Ensure customer receives refund confirmation"
                    }
                ],
                "complete_resolution_path": [
                    { "action": "Monitor account", "details": "Watch for any similar issues" },
                    {
                        "action": "Update documentation",
                        "details": "Document the resolution process"
                    }
                ],
                "reasoning": "Password reset is the standard procedure for login issues when the customer cannot access their account.",
                "confidence_score": 0.85
            })
            .to_string(),
            Self::PredictTime => json!({
                "resolution_time_category": "quick",
                "estimated_time": "2 hours",
                "explanation": "Simple issue with standard resolution path."
            })
            .to_string(),
        }
    }
}

/// Offline backend with byte-identical output for identical input.
#[derive(Clone, Debug, Default)]
pub struct SimulatedClient;

impl SimulatedClient {
    pub fn new() -> Self {
        Self
    }
}

/// Maps a blake3 extended digest onto `EMBEDDING_DIMENSION` values in `[-1, 1)`.
pub fn hashed_embedding(text: &str) -> Vec<f32> {
    let mut bytes = [0_u8; EMBEDDING_DIMENSION * 4];
    blake3::Hasher::new().update(text.as_bytes()).finalize_xof().fill(&mut bytes);

    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (f64::from(raw) / f64::from(u32::MAX) * 2.0 - 1.0) as f32
        })
        .collect()
}

#[async_trait]
impl LlmClient for SimulatedClient {
    fn backend(&self) -> &'static str {
        "simulated"
    }

    fn embedding_model(&self) -> &str {
        SIMULATED_MODEL
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ModelError> {
        let task = CannedTask::detect(prompt);
        debug!(
            event_name = "llm.simulated.complete",
            task = ?task,
            max_tokens = options.max_tokens,
            "returning canned completion"
        );
        Ok(task.map(CannedTask::response).unwrap_or_else(|| FALLBACK_RESPONSE.to_string()))
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ModelError> {
        EmbeddingVector::new(SIMULATED_MODEL, hashed_embedding(text))
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::llm::{CompletionOptions, LlmClient};

    use super::{hashed_embedding, CannedTask, SimulatedClient, EMBEDDING_DIMENSION};

    #[test]
    fn task_line_takes_precedence_over_keywords() {
        let prompt = "task: predict_time\nSummarize nothing; route nowhere.";

        assert_eq!(CannedTask::detect(prompt), Some(CannedTask::PredictTime));
    }

    #[test]
    fn keywords_are_checked_in_fixed_order() {
        assert_eq!(CannedTask::detect("Please summarize the action items"), Some(CannedTask::Summarize));
        assert_eq!(CannedTask::detect("Extract every action"), Some(CannedTask::ExtractActions));
        assert_eq!(CannedTask::detect("Which team owns this?"), Some(CannedTask::Route));
        assert_eq!(CannedTask::detect("Recommend a fix"), Some(CannedTask::Recommend));
        assert_eq!(CannedTask::detect("How much time will it take"), Some(CannedTask::PredictTime));
        assert_eq!(CannedTask::detect("hello there"), None);
    }

    #[tokio::test]
    async fn unknown_prompt_gets_fallback_text() {
        let text = SimulatedClient::new()
            .complete("hello there", &CompletionOptions::default())
            .await
            .expect("completion");

        assert_eq!(text, "I'm not sure how to respond to that prompt.");
    }

    #[tokio::test]
    async fn canned_responses_are_json_for_structured_stages() {
        let client = SimulatedClient::new();
        for task in ["extract_actions", "route", "recommend_resolution", "predict_time"] {
            let text = client
                .complete(&format!("task: {task}\n"), &CompletionOptions::default())
                .await
                .expect("completion");
            assert!(serde_json::from_str::<serde_json::Value>(&text).is_ok(), "{task} is not json");
        }
    }

    #[tokio::test]
    async fn embeddings_are_deterministic_and_bounded() {
        let client = SimulatedClient::new();
        let first = client.embed("login issue").await.expect("embedding");
        let second = client.embed("login issue").await.expect("embedding");
        let other = client.embed("billing issue").await.expect("embedding");

        assert_eq!(first, second);
        assert_ne!(first.values, other.values);
        assert_eq!(first.dimension(), EMBEDDING_DIMENSION);
        assert!(hashed_embedding("x").iter().all(|value| (-1.0..=1.0).contains(value)));
    }
}
