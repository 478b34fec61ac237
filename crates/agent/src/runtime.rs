use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use supportflow_core::domain::conversation::{Conversation, ConversationId};
use supportflow_core::domain::record::ProcessingRecord;

use crate::orchestrator::{Orchestrator, PipelineError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl RunError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Pipeline(error) => error.class(),
            Self::Worker(_) => "worker_failure",
        }
    }
}

#[derive(Debug)]
pub struct ConversationOutcome {
    pub conversation_id: ConversationId,
    pub result: Result<ProcessingRecord, RunError>,
}

impl ConversationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs many conversations through one orchestrator with at most `max_concurrency`
/// in flight. Each conversation is still processed stage by stage.
#[derive(Clone)]
pub struct PipelineRuntime {
    orchestrator: Arc<Orchestrator>,
    max_concurrency: usize,
}

impl PipelineRuntime {
    pub fn new(orchestrator: Arc<Orchestrator>, max_concurrency: usize) -> Self {
        Self { orchestrator, max_concurrency: max_concurrency.max(1) }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Outcomes come back in input order regardless of completion order.
    pub async fn process_all(&self, conversations: Vec<Conversation>) -> Vec<ConversationOutcome> {
        let total = conversations.len();
        let ids: Vec<ConversationId> =
            conversations.iter().map(|conversation| conversation.id().clone()).collect();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = JoinSet::new();

        info!(
            event_name = "pipeline.batch.started",
            conversations = total,
            max_concurrency = self.max_concurrency,
            "starting batch"
        );

        for (index, conversation) in conversations.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let orchestrator = Arc::clone(&self.orchestrator);
            workers.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => orchestrator.process(&conversation).await.map_err(RunError::from),
                    Err(closed) => Err(RunError::Worker(closed.to_string())),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<ProcessingRecord, RunError>>> =
            (0..total).map(|_| None).collect();
        let mut join_failures = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(join_error) => {
                    error!(
                        event_name = "pipeline.batch.worker_failed",
                        error = %join_error,
                        "batch worker did not complete"
                    );
                    join_failures.push(join_error.to_string());
                }
            }
        }

        let mut join_failures = join_failures.into_iter();
        let outcomes: Vec<ConversationOutcome> = ids
            .into_iter()
            .zip(slots)
            .map(|(conversation_id, slot)| ConversationOutcome {
                conversation_id,
                result: slot.unwrap_or_else(|| {
                    Err(RunError::Worker(
                        join_failures.next().unwrap_or_else(|| "task did not report".to_string()),
                    ))
                }),
            })
            .collect();

        let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
        info!(
            event_name = "pipeline.batch.completed",
            conversations = total,
            succeeded,
            failed = total - succeeded,
            "batch finished"
        );
        outcomes
    }
}
