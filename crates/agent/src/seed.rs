use thiserror::Error;
use tracing::info;

use supportflow_db::fixtures::SAMPLE_EMBEDDING_TEXTS;
use supportflow_db::{
    EmbeddingRepository, HistoricalTicketRepository, RepositoryError, SeedDataset, SeedResult,
};

use crate::llm::{LlmClient, ModelError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("could not embed sample text: {0}")]
    Model(#[from] ModelError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Seeds historical tickets and the sample embeddings. Samples are embedded with the
/// configured client so they stay comparable with conversations processed later.
pub async fn seed_reference_data(
    llm: &dyn LlmClient,
    dataset: &SeedDataset,
    tickets: &dyn HistoricalTicketRepository,
    embeddings: &dyn EmbeddingRepository,
) -> Result<SeedResult, SeedError> {
    let mut vectors = Vec::with_capacity(SAMPLE_EMBEDDING_TEXTS.len());
    for text in SAMPLE_EMBEDDING_TEXTS {
        vectors.push(llm.embed(text).await?);
    }

    let result = dataset.load(tickets, embeddings, vectors).await?;
    info!(
        event_name = "seed.completed",
        backend = llm.backend(),
        tickets = result.tickets_seeded,
        embeddings = result.embeddings_seeded,
        "reference data seeded"
    );
    Ok(result)
}
