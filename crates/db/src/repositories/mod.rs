use async_trait::async_trait;
use thiserror::Error;

use supportflow_core::domain::conversation::{Conversation, ConversationId};
use supportflow_core::domain::embedding::StoredEmbedding;
use supportflow_core::domain::history::HistoricalTicket;
use supportflow_core::domain::record::ProcessingRecord;

pub mod embedding;
pub mod history;
pub mod memory;
pub mod record;

pub use embedding::SqlEmbeddingRepository;
pub use history::SqlHistoricalTicketRepository;
pub use memory::InMemoryStore;
pub use record::SqlRecordStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable home for finished pipeline runs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes the conversation, its turns, every stage result and the conversation
    /// embedding as one unit. A previous run for the same conversation id is replaced.
    async fn save(
        &self,
        conversation: &Conversation,
        record: &ProcessingRecord,
        embedding: &StoredEmbedding,
    ) -> Result<(), RepositoryError>;

    async fn find_record(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ProcessingRecord>, RepositoryError>;
}

#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    async fn upsert(&self, embedding: &StoredEmbedding) -> Result<(), RepositoryError>;

    /// Stored embeddings in insertion order, optionally restricted to one source type.
    async fn list(&self, source_type: Option<&str>)
        -> Result<Vec<StoredEmbedding>, RepositoryError>;
}

/// What a pipeline run needs from storage: stored embeddings to rank against, and a
/// place to write the finished record.
pub trait PipelineStore: RecordStore + EmbeddingRepository {}

impl<T: RecordStore + EmbeddingRepository + ?Sized> PipelineStore for T {}

#[async_trait]
pub trait HistoricalTicketRepository: Send + Sync {
    async fn save_all(&self, tickets: &[HistoricalTicket]) -> Result<(), RepositoryError>;

    async fn find_by_issue_type(
        &self,
        issue_type: &str,
        limit: u32,
    ) -> Result<Vec<HistoricalTicket>, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;
}
