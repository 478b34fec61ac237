use serde::Deserialize;

use supportflow_core::domain::results::{ResolutionRecommendation, ResolutionStep};

use crate::llm::{CompletionOptions, LlmClient};
use crate::prompt::{PromptInput, PromptLibrary, PromptTemplate};
use crate::structured::ParsedStageOutput;

use super::{complete, strip_list_marker, StageError};

pub const BEST_EFFORT_CONFIDENCE: f64 = 0.5;
const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Models return steps either as `{action, details}` objects or as bare strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepPayload {
    Detailed(ResolutionStep),
    Plain(String),
}

impl From<StepPayload> for ResolutionStep {
    fn from(step: StepPayload) -> Self {
        match step {
            StepPayload::Detailed(step) => step,
            StepPayload::Plain(text) => split_step(&text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationPayload {
    immediate_steps: Vec<StepPayload>,
    #[serde(default)]
    complete_resolution_path: Vec<StepPayload>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    confidence_score: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ResolutionRecommender {
    pub options: CompletionOptions,
}

impl Default for ResolutionRecommender {
    fn default() -> Self {
        Self { options: CompletionOptions::new(0.7, 1000) }
    }
}

impl ResolutionRecommender {
    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        prompts: &PromptLibrary,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<ResolutionRecommendation>, StageError> {
        let raw = complete(llm, prompts, PromptTemplate::RecommendResolution, input, &self.options)
            .await?;
        Ok(parse(&raw))
    }
}

pub fn parse(raw: &str) -> ParsedStageOutput<ResolutionRecommendation> {
    ParsedStageOutput::parse_payload(
        raw,
        |payload: RecommendationPayload| {
            Some(ResolutionRecommendation {
                immediate_steps: payload.immediate_steps.into_iter().map(Into::into).collect(),
                complete_resolution_path: payload
                    .complete_resolution_path
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                reasoning: payload.reasoning.trim().to_string(),
                confidence_score: payload
                    .confidence_score
                    .filter(|score| score.is_finite())
                    .unwrap_or(DEFAULT_CONFIDENCE)
                    .clamp(0.0, 1.0),
            })
        },
        heuristic,
    )
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Immediate,
    Complete,
    Reasoning,
}

impl Section {
    fn from_heading(lowered: &str) -> Option<Self> {
        if lowered.contains("immediate") || lowered.contains("next steps") {
            Some(Self::Immediate)
        } else if lowered.contains("complete") || lowered.contains("full resolution") {
            Some(Self::Complete)
        } else if lowered.contains("reasoning") || lowered.contains("rationale") {
            Some(Self::Reasoning)
        } else {
            None
        }
    }
}

fn heuristic(raw: &str) -> ResolutionRecommendation {
    let mut section = Section::Preamble;
    let mut immediate = Vec::new();
    let mut complete_path = Vec::new();
    let mut reasoning: Vec<&str> = Vec::new();

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let marked = strip_list_marker(line);
        if marked.is_none() {
            if let Some(next) = Section::from_heading(&line.to_lowercase()) {
                section = next;
                continue;
            }
        }

        let step_text = marked.or_else(|| line.contains(':').then_some(line));
        match (section, step_text) {
            (Section::Immediate, Some(text)) => immediate.push(split_step(text)),
            (Section::Complete, Some(text)) => complete_path.push(split_step(text)),
            (Section::Reasoning, _) => reasoning.push(line),
            _ => {}
        }
    }

    let mut reasoning = reasoning.join(" ");
    if immediate.is_empty() && complete_path.is_empty() && reasoning.is_empty() {
        reasoning = raw.trim().to_string();
    }

    ResolutionRecommendation {
        immediate_steps: immediate,
        complete_resolution_path: complete_path,
        reasoning,
        confidence_score: BEST_EFFORT_CONFIDENCE,
    }
}

/// `"Action: details"` splits on the first colon; anything else is all action.
fn split_step(text: &str) -> ResolutionStep {
    match text.split_once(':') {
        Some((action, details)) if !action.trim().is_empty() => ResolutionStep {
            action: action.trim().to_string(),
            details: details.trim().to_string(),
        },
        _ => ResolutionStep { action: text.trim().to_string(), details: String::new() },
    }
}

#[cfg(test)]
mod tests {
    use supportflow_core::domain::record::ParseMode;

    use super::{parse, BEST_EFFORT_CONFIDENCE};

    #[test]
    fn json_accepts_plain_string_steps() {
        let raw = r#"{"immediate_steps": ["Verify charge: check billing history",
            {"action": "Refund", "details": "Issue refund"}],
            "reasoning": "Duplicate charge", "confidence_score": 1.4}"#;

        let parsed = parse(raw);

        assert_eq!(parsed.mode(), ParseMode::Structured);
        let recommendation = parsed.into_value();
        assert_eq!(recommendation.immediate_steps[0].action, "Verify charge");
        assert_eq!(recommendation.immediate_steps[0].details, "check billing history");
        assert_eq!(recommendation.immediate_steps[1].action, "Refund");
        assert!(recommendation.complete_resolution_path.is_empty());
        assert_eq!(recommendation.confidence_score, 1.0);
    }

    #[test]
    fn sections_are_detected_in_free_text() {
        let raw = "Immediate next steps:\n- Reset password: send link\n- Unlock account\n\
                   Complete resolution path:\n1. Monitor logins\n\
                   Reasoning:\nStandard procedure for lockouts.\nNo escalation needed.";

        let parsed = parse(raw);

        assert_eq!(parsed.mode(), ParseMode::BestEffort);
        let recommendation = parsed.into_value();
        let immediate: Vec<(&str, &str)> = recommendation
            .immediate_steps
            .iter()
            .map(|step| (step.action.as_str(), step.details.as_str()))
            .collect();
        assert_eq!(immediate, vec![("Reset password", "send link"), ("Unlock account", "")]);
        assert_eq!(recommendation.complete_resolution_path.len(), 1);
        assert_eq!(recommendation.complete_resolution_path[0].action, "Monitor logins");
        assert_eq!(
            recommendation.reasoning,
            "Standard procedure for lockouts. No escalation needed."
        );
        assert_eq!(recommendation.confidence_score, BEST_EFFORT_CONFIDENCE);
    }

    #[test]
    fn unsectioned_text_is_kept_as_reasoning() {
        let recommendation = parse("Ask the customer to restart the router.").into_value();

        assert!(recommendation.immediate_steps.is_empty());
        assert_eq!(recommendation.reasoning, "Ask the customer to restart the router.");
        assert_eq!(recommendation.confidence_score, BEST_EFFORT_CONFIDENCE);
    }
}
