//! The five model-backed stages.
//!
//! Every stage renders its prompt, calls the model once with stage-specific sampling
//! options and parses the reply schema-first: a JSON object that matches the stage
//! contract is `Structured`, anything else is recovered line by line as `BestEffort`.
//! Model errors are returned unchanged; parse problems never are.

use thiserror::Error;

use supportflow_core::domain::results::{
    ActionList, ResolutionRecommendation, RoutingDecision, TimePrediction,
};

use crate::llm::{CompletionOptions, LlmClient, ModelError};
use crate::prompt::{PromptError, PromptInput, PromptLibrary, PromptTemplate};
use crate::structured::ParsedStageOutput;

pub mod actions;
pub mod resolution;
pub mod routing;
pub mod summarize;
pub mod time_prediction;

pub use actions::ActionExtractor;
pub use resolution::ResolutionRecommender;
pub use routing::Router;
pub use summarize::Summarizer;
pub use time_prediction::TimePredictor;

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

pub(crate) async fn complete(
    llm: &dyn LlmClient,
    prompts: &PromptLibrary,
    template: PromptTemplate,
    input: &PromptInput<'_>,
    options: &CompletionOptions,
) -> Result<String, StageError> {
    let prompt = prompts.render(template, input)?;
    Ok(llm.complete(&prompt, options).await?)
}

/// Strips a leading `-`, `•`, `*`, `1.` or `1)` marker, returning `None` for unmarked lines.
pub(crate) fn strip_list_marker(line: &str) -> Option<&str> {
    let line = line.trim_start();
    for marker in ['-', '•', '*'] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')).map(str::trim)
}

/// The five stages plus the prompt templates they share.
#[derive(Clone, Debug)]
pub struct StageSet {
    prompts: PromptLibrary,
    pub summarizer: Summarizer,
    pub action_extractor: ActionExtractor,
    pub router: Router,
    pub recommender: ResolutionRecommender,
    pub time_predictor: TimePredictor,
}

impl StageSet {
    /// Stages with their default sampling options and the bundled templates.
    pub fn new() -> Result<Self, PromptError> {
        Ok(Self::with_prompts(PromptLibrary::embedded()?))
    }

    pub fn with_prompts(prompts: PromptLibrary) -> Self {
        Self {
            prompts,
            summarizer: Summarizer::default(),
            action_extractor: ActionExtractor::default(),
            router: Router::default(),
            recommender: ResolutionRecommender::default(),
            time_predictor: TimePredictor::default(),
        }
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    pub async fn summarize(
        &self,
        llm: &dyn LlmClient,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<String>, StageError> {
        self.summarizer.run(llm, &self.prompts, input).await
    }

    pub async fn extract_actions(
        &self,
        llm: &dyn LlmClient,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<ActionList>, StageError> {
        self.action_extractor.run(llm, &self.prompts, input).await
    }

    pub async fn route(
        &self,
        llm: &dyn LlmClient,
        input: &PromptInput<'_>,
        decided_at: &str,
    ) -> Result<ParsedStageOutput<RoutingDecision>, StageError> {
        self.router.run(llm, &self.prompts, input, decided_at).await
    }

    pub async fn recommend(
        &self,
        llm: &dyn LlmClient,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<ResolutionRecommendation>, StageError> {
        self.recommender.run(llm, &self.prompts, input).await
    }

    pub async fn predict_time(
        &self,
        llm: &dyn LlmClient,
        input: &PromptInput<'_>,
    ) -> Result<ParsedStageOutput<TimePrediction>, StageError> {
        self.time_predictor.run(llm, &self.prompts, input).await
    }
}
