use std::collections::HashMap;

use tokio::sync::RwLock;

use supportflow_core::domain::conversation::{Conversation, ConversationId};
use supportflow_core::domain::embedding::StoredEmbedding;
use supportflow_core::domain::history::HistoricalTicket;
use supportflow_core::domain::record::ProcessingRecord;

use super::{EmbeddingRepository, HistoricalTicketRepository, RecordStore, RepositoryError};

#[derive(Default)]
struct State {
    records: HashMap<String, ProcessingRecord>,
    embeddings: Vec<StoredEmbedding>,
    tickets: Vec<HistoricalTicket>,
}

impl State {
    fn upsert_embedding(&mut self, embedding: &StoredEmbedding) {
        let existing = self.embeddings.iter_mut().find(|stored| {
            stored.source_type == embedding.source_type && stored.source_id == embedding.source_id
        });
        match existing {
            Some(stored) => *stored = embedding.clone(),
            None => self.embeddings.push(embedding.clone()),
        }
    }
}

/// One lock over every collection, so a record and its embedding land together.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryStore {
    async fn save(
        &self,
        conversation: &Conversation,
        record: &ProcessingRecord,
        embedding: &StoredEmbedding,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.records.insert(conversation.id().to_string(), record.clone());
        state.upsert_embedding(embedding);
        Ok(())
    }

    async fn find_record(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ProcessingRecord>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.records.get(id.as_str()).cloned())
    }
}

#[async_trait::async_trait]
impl EmbeddingRepository for InMemoryStore {
    async fn upsert(&self, embedding: &StoredEmbedding) -> Result<(), RepositoryError> {
        self.state.write().await.upsert_embedding(embedding);
        Ok(())
    }

    async fn list(
        &self,
        source_type: Option<&str>,
    ) -> Result<Vec<StoredEmbedding>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .embeddings
            .iter()
            .filter(|stored| source_type.map_or(true, |wanted| stored.source_type == wanted))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl HistoricalTicketRepository for InMemoryStore {
    async fn save_all(&self, tickets: &[HistoricalTicket]) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for ticket in tickets {
            match state.tickets.iter_mut().find(|stored| stored.ticket_id == ticket.ticket_id) {
                Some(stored) => *stored = ticket.clone(),
                None => state.tickets.push(ticket.clone()),
            }
        }
        Ok(())
    }

    async fn find_by_issue_type(
        &self,
        issue_type: &str,
        limit: u32,
    ) -> Result<Vec<HistoricalTicket>, RepositoryError> {
        let state = self.state.read().await;
        let mut found: Vec<HistoricalTicket> = state
            .tickets
            .iter()
            .filter(|ticket| ticket.issue_type.eq_ignore_ascii_case(issue_type))
            .cloned()
            .collect();
        found.sort_by(|left, right| {
            right.created_date.cmp(&left.created_date).then_with(|| left.ticket_id.cmp(&right.ticket_id))
        });
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.read().await.tickets.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use supportflow_core::domain::conversation::{Conversation, Speaker, Turn};
    use supportflow_core::domain::embedding::{EmbeddingVector, StoredEmbedding};

    use crate::repositories::{EmbeddingRepository, InMemoryStore};

    fn embedding(id: &str, source_type: &str) -> StoredEmbedding {
        StoredEmbedding {
            source_type: source_type.to_string(),
            source_id: id.to_string(),
            text: id.to_string(),
            vector: EmbeddingVector::new("simulated", vec![1.0, 0.0]).expect("vector"),
        }
    }

    #[tokio::test]
    async fn in_memory_embeddings_keep_insertion_order() {
        let store = InMemoryStore::default();
        store.upsert(&embedding("b", "conversation")).await.expect("b");
        store.upsert(&embedding("a", "sample")).await.expect("a");
        store.upsert(&embedding("b", "conversation")).await.expect("b again");

        let all = store.list(None).await.expect("list");
        let samples = store.list(Some("sample")).await.expect("samples");

        let ids: Vec<&str> = all.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(samples.len(), 1);
    }

    #[tokio::test]
    async fn empty_store_has_no_records() {
        let store = InMemoryStore::default();
        let conversation =
            Conversation::new("c1", vec![Turn::new(Speaker::Customer, "hi")]).expect("conversation");

        assert_eq!(store.record_count().await, 0);
        assert_eq!(
            crate::repositories::RecordStore::find_record(&store, conversation.id())
                .await
                .expect("find"),
            None
        );
    }
}
