use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use supportflow_core::domain::results::{
    ActionItem, KnowledgeArticle, ResolutionStep, RoutingDecision, SimilarConversation,
    TimeCategory,
};
use supportflow_core::entities::ExtractedEntities;

pub const SUPPORT_TEAMS: &[&str] = &[
    "Technical Support",
    "Billing Support",
    "Account Management",
    "Product Support",
    "Security Team",
    "Escalations Team",
    "General Support",
];

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template error: {0}")]
    Template(String),
}

/// One rendered template per model-backed stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptTemplate {
    Summarize,
    ExtractActions,
    Route,
    RecommendResolution,
    PredictTime,
}

impl PromptTemplate {
    pub fn name(self) -> &'static str {
        match self {
            Self::Summarize => "summarize.tera",
            Self::ExtractActions => "extract_actions.tera",
            Self::Route => "route.tera",
            Self::RecommendResolution => "recommend_resolution.tera",
            Self::PredictTime => "predict_time.tera",
        }
    }
}

#[derive(Debug, Serialize)]
struct TimeCategoryHint {
    name: String,
    estimate: String,
}

/// Everything a prompt may reference. Later stages see the outputs of earlier ones.
#[derive(Clone, Copy, Debug)]
pub struct PromptInput<'a> {
    pub transcript: &'a str,
    pub entities: &'a ExtractedEntities,
    pub summary: Option<&'a str>,
    pub actions: &'a [ActionItem],
    pub knowledge: &'a [KnowledgeArticle],
    pub routing: Option<&'a RoutingDecision>,
    pub similar: &'a [SimilarConversation],
    pub immediate_steps: &'a [ResolutionStep],
}

impl<'a> PromptInput<'a> {
    pub fn new(transcript: &'a str, entities: &'a ExtractedEntities) -> Self {
        Self {
            transcript,
            entities,
            summary: None,
            actions: &[],
            knowledge: &[],
            routing: None,
            similar: &[],
            immediate_steps: &[],
        }
    }

    fn context(&self) -> Context {
        let time_categories: Vec<TimeCategoryHint> = TimeCategory::ALL
            .into_iter()
            .map(|category| TimeCategoryHint {
                name: category.as_str().to_string(),
                estimate: category.default_estimate(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("transcript", self.transcript);
        context.insert("entities", self.entities);
        context.insert("summary", &self.summary);
        context.insert("actions", self.actions);
        context.insert("knowledge", self.knowledge);
        context.insert("routing", &self.routing);
        context.insert("similar", self.similar);
        context.insert("immediate_steps", self.immediate_steps);
        context.insert("teams", SUPPORT_TEAMS);
        context.insert("time_categories", &time_categories);
        context
    }
}

/// Stage prompts compiled once from the templates bundled into the binary.
#[derive(Clone, Debug)]
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn embedded() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("_context.tera", include_str!("../../../templates/prompts/_context.tera")),
            ("summarize.tera", include_str!("../../../templates/prompts/summarize.tera")),
            (
                "extract_actions.tera",
                include_str!("../../../templates/prompts/extract_actions.tera"),
            ),
            ("route.tera", include_str!("../../../templates/prompts/route.tera")),
            (
                "recommend_resolution.tera",
                include_str!("../../../templates/prompts/recommend_resolution.tera"),
            ),
            ("predict_time.tera", include_str!("../../../templates/prompts/predict_time.tera")),
        ])
        .map_err(|e| PromptError::Template(e.to_string()))?;

        Ok(Self { tera })
    }

    pub fn render(
        &self,
        template: PromptTemplate,
        input: &PromptInput<'_>,
    ) -> Result<String, PromptError> {
        self.tera
            .render(template.name(), &input.context())
            .map_err(|e| PromptError::Template(format!("{}: {e}", template.name())))
    }
}
