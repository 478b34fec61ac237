use serde::Deserialize;

use supportflow_core::domain::results::{ActionItem, ActionList, ActionStatus, Priority};

use crate::llm::{CompletionOptions, LlmClient};
use crate::prompt::{PromptInput, PromptLibrary, PromptTemplate};
use crate::structured::ParsedStageOutput;

use super::{complete, strip_list_marker, StageError};

#[derive(Debug, Deserialize)]
struct ActionPayload {
    action_items: Vec<ActionItem>,
}

#[derive(Clone, Debug)]
pub struct ActionExtractor {
    pub options: CompletionOptions,
}

impl Default for ActionExtractor {
    fn default() -> Self {
        Self { options: CompletionOptions::new(0.2, 300) }
    }
}

impl ActionExtractor {
    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        prompts: &PromptLibrary,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<ActionList>, StageError> {
        let raw =
            complete(llm, prompts, PromptTemplate::ExtractActions, input, &self.options).await?;
        Ok(parse(&raw))
    }
}

/// `total_actions` is always recomputed from the decoded items.
pub fn parse(raw: &str) -> ParsedStageOutput<ActionList> {
    ParsedStageOutput::parse_payload(
        raw,
        |payload: ActionPayload| Some(ActionList::new(payload.action_items)),
        heuristic,
    )
}

fn heuristic(raw: &str) -> ActionList {
    let mut items: Vec<ActionItem> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let action = match strip_list_marker(line) {
                Some(rest) => rest,
                None if line.to_lowercase().contains("action") => line,
                None => return None,
            };
            if action.is_empty() {
                return None;
            }
            Some(ActionItem {
                action: action.to_string(),
                priority: priority_hint(line),
                status: ActionStatus::Pending,
            })
        })
        .collect();

    let trimmed = raw.trim();
    if items.is_empty() && !trimmed.is_empty() {
        items.push(ActionItem {
            action: trimmed.to_string(),
            priority: Priority::Low,
            status: ActionStatus::Pending,
        });
    }

    ActionList::new(items)
}

fn priority_hint(line: &str) -> Priority {
    let line = line.to_lowercase();
    if line.contains("high") {
        Priority::High
    } else if line.contains("medium") {
        Priority::Medium
    } else {
        Priority::Low
    }
}
