use serde::Deserialize;

use crate::llm::{CompletionOptions, LlmClient};
use crate::prompt::{PromptInput, PromptLibrary, PromptTemplate};
use crate::structured::ParsedStageOutput;

use super::{complete, StageError};

pub const EMPTY_SUMMARY: &str = "(no summary produced)";

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: String,
}

#[derive(Clone, Debug)]
pub struct Summarizer {
    pub options: CompletionOptions,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self { options: CompletionOptions::new(0.3, 150) }
    }
}

impl Summarizer {
    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        prompts: &PromptLibrary,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<String>, StageError> {
        let raw = complete(llm, prompts, PromptTemplate::Summarize, input, &self.options).await?;
        Ok(parse(&raw))
    }
}

/// Plain text is the summary contract; a `{"summary": ...}` wrapper is unwrapped.
pub fn parse(raw: &str) -> ParsedStageOutput<String> {
    let text = raw.trim();
    if text.starts_with('{') {
        if let Ok(payload) = serde_json::from_str::<SummaryPayload>(text) {
            let summary = payload.summary.trim();
            if !summary.is_empty() {
                return ParsedStageOutput::Structured(summary.to_string());
            }
        }
    }

    if text.is_empty() {
        ParsedStageOutput::BestEffort { value: EMPTY_SUMMARY.to_string(), raw: raw.to_string() }
    } else {
        ParsedStageOutput::Structured(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use supportflow_core::domain::record::ParseMode;

    use super::{parse, EMPTY_SUMMARY};

    #[test]
    fn response_text_is_trimmed() {
        let parsed = parse("\n  Customer could not log in.  \n");

        assert_eq!(parsed.mode(), ParseMode::Structured);
        assert_eq!(parsed.value(), "Customer could not log in.");
    }

    #[test]
    fn json_wrapper_is_unwrapped() {
        assert_eq!(parse(r#"{"summary": " Refund issued. "}"#).into_value(), "Refund issued.");
    }

    #[test]
    fn empty_response_gets_placeholder() {
        let parsed = parse("   ");

        assert_eq!(parsed.mode(), ParseMode::BestEffort);
        assert_eq!(parsed.value(), EMPTY_SUMMARY);
    }
}
