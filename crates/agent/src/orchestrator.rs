//! Runs one conversation through the fixed stage sequence.
//!
//! ```text
//! ingest → sentiment → summarize → extract_actions → retrieve_knowledge → route
//!        → embed → similarity → recommend → predict_time → persist
//! ```
//!
//! Stages run strictly in order and each one sees the outputs of those before it.
//! The first failure aborts the run with the failing stage named; nothing is written
//! unless every stage succeeded, and the final write is a single store call.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use supportflow_core::config::AppConfig;
use supportflow_core::domain::conversation::Conversation;
use supportflow_core::domain::embedding::StoredEmbedding;
use supportflow_core::domain::record::{ProcessingRecord, ProcessingTime, Stage, StageTimings};
use supportflow_core::entities;
use supportflow_core::errors::DomainError;
use supportflow_core::knowledge::{query_from_summary, KnowledgeBase};
use supportflow_core::sentiment::{self, SentimentScope};
use supportflow_core::similarity::SimilarityLookup;
use supportflow_core::transcript::format_conversation;
use supportflow_db::{EmbeddingRepository, PipelineStore, RecordStore, RepositoryError};

use crate::llm::{LlmClient, ModelError};
use crate::prompt::{PromptError, PromptInput};
use crate::stages::{StageError, StageSet};

/// `source_type` under which processed conversations store their embedding.
pub const CONVERSATION_SOURCE_TYPE: &str = "conversation";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a stage could not complete.
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error("invalid conversation: {0}")]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] RepositoryError),
    #[error("conversation deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl From<StageError> for StageFailure {
    fn from(error: StageError) -> Self {
        match error {
            StageError::Model(error) => Self::Model(error),
            StageError::Prompt(error) => Self::Prompt(error),
        }
    }
}

impl StageFailure {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Model(error) => error.class(),
            Self::Prompt(_) => "prompt_template",
            Self::Persistence(_) => "persistence_failure",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("processing failed at stage `{stage}`: {source}")]
    ProcessingFailed {
        stage: Stage,
        #[source]
        source: StageFailure,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::ProcessingFailed { stage, .. } => *stage,
        }
    }

    pub fn failure(&self) -> &StageFailure {
        match self {
            Self::ProcessingFailed { source, .. } => source,
        }
    }

    pub fn class(&self) -> &'static str {
        self.failure().class()
    }
}

#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    /// Budget for the whole run, checked around every stage.
    pub deadline: Duration,
    pub similar_limit: usize,
    pub sentiment_scope: SentimentScope,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(600),
            similar_limit: 3,
            sentiment_scope: SentimentScope::AllTurns,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            deadline: config.pipeline.conversation_deadline(),
            similar_limit: config.pipeline.similar_limit,
            sentiment_scope: SentimentScope::from_customer_only(config.sentiment.customer_only),
        }
    }
}

struct RunClock {
    deadline_at: Instant,
    timings: StageTimings,
}

pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    stages: StageSet,
    knowledge: KnowledgeBase,
    store: Arc<dyn PipelineStore>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        stages: StageSet,
        knowledge: KnowledgeBase,
        store: Arc<dyn PipelineStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self { llm, stages, knowledge, store, settings }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub async fn process(
        &self,
        conversation: &Conversation,
    ) -> Result<ProcessingRecord, PipelineError> {
        let correlation_id = Uuid::new_v4().to_string();
        let conversation_id = conversation.id().to_string();
        let started_at = Utc::now();
        let run_started = Instant::now();
        let mut clock = RunClock {
            deadline_at: run_started + self.settings.deadline,
            timings: StageTimings::default(),
        };

        info!(
            event_name = "pipeline.run.started",
            correlation_id = %correlation_id,
            conversation_id = %conversation_id,
            turns = conversation.turns().len(),
            backend = self.llm.backend(),
            "processing conversation"
        );

        let result = self
            .run_stages(conversation, &correlation_id, started_at, run_started, &mut clock)
            .await;

        match &result {
            Ok(record) => info!(
                event_name = "pipeline.run.completed",
                correlation_id = %correlation_id,
                conversation_id = %conversation_id,
                total_secs = record.processing_time.total,
                "conversation processed"
            ),
            Err(error) => warn!(
                event_name = "pipeline.run.failed",
                correlation_id = %correlation_id,
                conversation_id = %conversation_id,
                stage = %error.stage(),
                error_class = error.class(),
                error = %error,
                "conversation processing aborted"
            ),
        }

        result
    }

    async fn run_stages(
        &self,
        conversation: &Conversation,
        correlation_id: &str,
        started_at: DateTime<Utc>,
        run_started: Instant,
        clock: &mut RunClock,
    ) -> Result<ProcessingRecord, PipelineError> {
        let llm = self.llm.as_ref();

        let transcript = self
            .step(clock, correlation_id, Stage::Ingest, async {
                if conversation.turns().is_empty() {
                    return Err(StageFailure::Validation(DomainError::EmptyConversation(
                        conversation.id().to_string(),
                    )));
                }
                Ok(format_conversation(conversation))
            })
            .await?;
        let extracted = entities::extract(&transcript);

        let sentiment_analysis = self
            .step(clock, correlation_id, Stage::Sentiment, async {
                Ok::<_, StageFailure>(sentiment::analyze(
                    conversation.turns(),
                    self.settings.sentiment_scope,
                ))
            })
            .await?;

        let mut parse_modes = BTreeMap::new();
        let mut input = PromptInput::new(&transcript, &extracted);

        let summary = self
            .step(clock, correlation_id, Stage::Summarize, self.stages.summarize(llm, &input))
            .await?;
        parse_modes.insert(Stage::Summarize, summary.mode());
        let summary = summary.into_value();
        input.summary = Some(&summary);

        let actions = self
            .step(
                clock,
                correlation_id,
                Stage::ExtractActions,
                self.stages.extract_actions(llm, &input),
            )
            .await?;
        parse_modes.insert(Stage::ExtractActions, actions.mode());
        let actions = actions.into_value();
        input.actions = &actions.action_items;

        let knowledge_articles = self
            .step(clock, correlation_id, Stage::RetrieveKnowledge, async {
                Ok::<_, StageFailure>(self.knowledge.search(&query_from_summary(&summary)))
            })
            .await?;
        input.knowledge = &knowledge_articles;

        let decided_at = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let routing = self
            .step(clock, correlation_id, Stage::Route, self.stages.route(llm, &input, &decided_at))
            .await?;
        parse_modes.insert(Stage::Route, routing.mode());
        let routing = routing.into_value();
        input.routing = Some(&routing);

        let vector = self.step(clock, correlation_id, Stage::Embed, llm.embed(&transcript)).await?;
        let conversation_embedding = StoredEmbedding {
            source_type: CONVERSATION_SOURCE_TYPE.to_string(),
            source_id: conversation.id().to_string(),
            text: summary.clone(),
            vector,
        };

        let similar_conversations = self
            .step(clock, correlation_id, Stage::Similarity, async {
                let candidates = self.store.list(None).await?;
                Ok::<_, StageFailure>(SimilarityLookup::new(self.settings.similar_limit).rank(
                    &conversation_embedding.vector,
                    Some(conversation.id().as_str()),
                    &candidates,
                ))
            })
            .await?;
        input.similar = &similar_conversations;

        let recommendations = self
            .step(clock, correlation_id, Stage::Recommend, self.stages.recommend(llm, &input))
            .await?;
        parse_modes.insert(Stage::Recommend, recommendations.mode());
        let recommendations = recommendations.into_value();
        input.immediate_steps = &recommendations.immediate_steps;

        let time_prediction = self
            .step(clock, correlation_id, Stage::PredictTime, self.stages.predict_time(llm, &input))
            .await?;
        parse_modes.insert(Stage::PredictTime, time_prediction.mode());
        let time_prediction = time_prediction.into_value();

        let record = ProcessingRecord {
            conversation_id: conversation.id().clone(),
            processing_time: ProcessingTime {
                start: started_at,
                steps: clock.timings.clone(),
                total: run_started.elapsed().as_secs_f64(),
            },
            sentiment_analysis,
            summary,
            actions,
            knowledge_articles,
            routing,
            similar_conversations,
            recommendations,
            time_prediction,
            parse_modes,
        };

        self.step(clock, correlation_id, Stage::Persist, async {
            self.store.save(conversation, &record, &conversation_embedding).await?;
            Ok::<_, StageFailure>(())
        })
        .await?;

        Ok(record)
    }

    /// Runs one stage under the run deadline, recording its wall-clock time on success.
    async fn step<T, E, F>(
        &self,
        clock: &mut RunClock,
        correlation_id: &str,
        stage: Stage,
        work: F,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<StageFailure>,
    {
        let started = Instant::now();
        debug!(event_name = "pipeline.stage.started", correlation_id, stage = %stage, "stage started");

        let outcome = match timeout_at(clock.deadline_at, work).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(StageFailure::DeadlineExceeded(self.settings.deadline)),
        };
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(value) => {
                if stage != Stage::Persist {
                    clock.timings.record(stage, elapsed);
                }
                debug!(
                    event_name = "pipeline.stage.completed",
                    correlation_id,
                    stage = %stage,
                    elapsed_secs = elapsed,
                    "stage completed"
                );
                Ok(value)
            }
            Err(source) => Err(PipelineError::ProcessingFailed { stage, source }),
        }
    }
}
