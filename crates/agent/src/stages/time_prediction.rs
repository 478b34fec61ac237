use serde::Deserialize;

use supportflow_core::domain::results::{TimeCategory, TimePrediction};

use crate::llm::{CompletionOptions, LlmClient};
use crate::prompt::{PromptInput, PromptLibrary, PromptTemplate};
use crate::structured::ParsedStageOutput;

use super::{complete, StageError};

const HEURISTIC_EXPLANATION: &str = "Estimated from unstructured model output.";

/// Compound labels are checked before the single words they contain.
const MATCH_ORDER: [TimeCategory; 6] = [
    TimeCategory::VeryQuick,
    TimeCategory::VeryLong,
    TimeCategory::Quick,
    TimeCategory::Medium,
    TimeCategory::Long,
    TimeCategory::Complex,
];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EstimatePayload {
    Text(String),
    Hours(f64),
}

#[derive(Debug, Deserialize)]
struct PredictionPayload {
    #[serde(alias = "predicted_category", alias = "category")]
    resolution_time_category: String,
    #[serde(default, alias = "hours", alias = "estimated_hours")]
    estimated_time: Option<EstimatePayload>,
    #[serde(default)]
    explanation: String,
}

#[derive(Clone, Debug)]
pub struct TimePredictor {
    pub options: CompletionOptions,
}

impl Default for TimePredictor {
    fn default() -> Self {
        Self { options: CompletionOptions::new(0.7, 1000) }
    }
}

impl TimePredictor {
    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        prompts: &PromptLibrary,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<TimePrediction>, StageError> {
        let raw = complete(llm, prompts, PromptTemplate::PredictTime, input, &self.options).await?;
        Ok(parse(&raw))
    }
}

/// A JSON reply only counts as structured when its category is one of the known buckets.
pub fn parse(raw: &str) -> ParsedStageOutput<TimePrediction> {
    ParsedStageOutput::parse_payload(
        raw,
        |payload: PredictionPayload| {
            let category = TimeCategory::parse(&payload.resolution_time_category)?;
            let estimated_time = match payload.estimated_time {
                Some(EstimatePayload::Text(text)) if !text.trim().is_empty() => {
                    text.trim().to_string()
                }
                Some(EstimatePayload::Hours(hours)) if hours.is_finite() && hours > 0.0 => {
                    format_hours(hours)
                }
                _ => category.default_estimate(),
            };
            Some(TimePrediction {
                resolution_time_category: category.as_str().to_string(),
                estimated_time,
                explanation: payload.explanation.trim().to_string(),
            })
        },
        heuristic,
    )
}

fn heuristic(raw: &str) -> TimePrediction {
    let lowered = raw.to_lowercase();
    let category = MATCH_ORDER
        .into_iter()
        .find(|category| {
            let label = category.as_str();
            lowered.contains(label) || lowered.contains(&label.replace('_', " "))
        })
        .unwrap_or(TimeCategory::Medium);

    let estimated_time = explicit_duration(raw).unwrap_or_else(|| category.default_estimate());

    let explanation = raw
        .lines()
        .map(str::trim)
        .find(|line| {
            let line = line.to_lowercase();
            line.contains("because") || line.contains("reason")
        })
        .map(str::to_string)
        .unwrap_or_else(|| HEURISTIC_EXPLANATION.to_string());

    TimePrediction {
        resolution_time_category: category.as_str().to_string(),
        estimated_time,
        explanation,
    }
}

/// First `N hour(s)` or `N day(s)` phrase in the text.
fn explicit_duration(raw: &str) -> Option<String> {
    let words: Vec<String> = raw
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.').to_lowercase()
        })
        .collect();

    words.windows(2).find_map(|pair| {
        let amount: u32 = pair[0].trim_end_matches('.').parse().ok()?;
        let unit = if pair[1].starts_with("hour") || pair[1].starts_with("hr") {
            "hour"
        } else if pair[1].starts_with("day") {
            "day"
        } else {
            return None;
        };
        Some(if amount == 1 { format!("1 {unit}") } else { format!("{amount} {unit}s") })
    })
}

fn format_hours(hours: f64) -> String {
    if (hours - 1.0).abs() < f64::EPSILON {
        "1 hour".to_string()
    } else if hours.fract() == 0.0 {
        format!("{hours:.0} hours")
    } else {
        format!("{hours} hours")
    }
}
