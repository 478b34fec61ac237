use serde::Deserialize;

use supportflow_core::domain::results::{ConfidenceLabel, RoutingDecision};

use crate::llm::{CompletionOptions, LlmClient};
use crate::prompt::{PromptInput, PromptLibrary, PromptTemplate, SUPPORT_TEAMS};
use crate::structured::ParsedStageOutput;

use super::{complete, StageError};

pub const DEFAULT_TEAM: &str = "General Support";

#[derive(Debug, Deserialize)]
struct RoutingPayload {
    recommended_team: String,
    #[serde(default = "default_confidence")]
    confidence: ConfidenceLabel,
    #[serde(default)]
    justification: String,
    #[serde(default)]
    timestamp: Option<String>,
}

fn default_confidence() -> ConfidenceLabel {
    ConfidenceLabel::Medium
}

#[derive(Clone, Debug)]
pub struct Router {
    pub options: CompletionOptions,
}

impl Default for Router {
    fn default() -> Self {
        Self { options: CompletionOptions::new(0.2, 200) }
    }
}

impl Router {
    /// `decided_at` stamps decisions whose reply carries no timestamp of its own.
    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        prompts: &PromptLibrary,
        input: &PromptInput<'_>,
        decided_at: &str,
    ) -> Result<ParsedStageOutput<RoutingDecision>, StageError> {
        let raw = complete(llm, prompts, PromptTemplate::Route, input, &self.options).await?;
        Ok(parse(&raw, decided_at))
    }
}

pub fn parse(raw: &str, decided_at: &str) -> ParsedStageOutput<RoutingDecision> {
    ParsedStageOutput::parse_payload(
        raw,
        |payload: RoutingPayload| {
            let team = payload.recommended_team.trim();
            if team.is_empty() {
                return None;
            }
            Some(RoutingDecision {
                recommended_team: team.to_string(),
                confidence: payload.confidence,
                justification: payload.justification.trim().to_string(),
                timestamp: payload
                    .timestamp
                    .filter(|stamp| !stamp.trim().is_empty())
                    .unwrap_or_else(|| decided_at.to_string()),
            })
        },
        |text| heuristic(text, decided_at),
    )
}

fn heuristic(raw: &str, decided_at: &str) -> RoutingDecision {
    let mut team: Option<&'static str> = None;
    let mut confidence: Option<ConfidenceLabel> = None;
    let mut justification: Vec<&str> = Vec::new();

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let lowered = line.to_lowercase();

        if team.is_none() {
            team = SUPPORT_TEAMS
                .iter()
                .copied()
                .find(|candidate| lowered.contains(&candidate.to_lowercase()));
        }

        if lowered.contains("confidence") {
            if lowered.contains("high") {
                confidence = Some(ConfidenceLabel::High);
            } else if lowered.contains("medium") {
                confidence = Some(ConfidenceLabel::Medium);
            } else if lowered.contains("low") {
                confidence = Some(ConfidenceLabel::Low);
            }
        }

        if lowered.contains("because") || lowered.contains("reason") || line.contains(':') {
            justification.push(line);
        }
    }

    let (team, default_confidence) = match team {
        Some(team) => (team, ConfidenceLabel::Medium),
        None => (DEFAULT_TEAM, ConfidenceLabel::Low),
    };

    RoutingDecision {
        recommended_team: team.to_string(),
        confidence: confidence.unwrap_or(default_confidence),
        justification: justification.join(" "),
        timestamp: decided_at.to_string(),
    }
}
