use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use supportflow_core::domain::conversation::{Conversation, ConversationId};
use supportflow_core::domain::embedding::StoredEmbedding;
use supportflow_core::domain::record::{ParseMode, ProcessingRecord, Stage};

use super::embedding::{list_embeddings, upsert_embedding};
use super::{EmbeddingRepository, RecordStore, RepositoryError};
use crate::DbPool;

pub struct SqlRecordStore {
    pool: DbPool,
}

impl SqlRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_mode_as_str(mode: ParseMode) -> &'static str {
    match mode {
        ParseMode::Structured => "structured",
        ParseMode::BestEffort => "best_effort",
    }
}

/// Splits a record into the per-stage payloads stored in `stage_results`.
pub fn stage_payloads(
    record: &ProcessingRecord,
    embedding: &StoredEmbedding,
) -> Result<Vec<(Stage, Value)>, serde_json::Error> {
    Ok(vec![
        (Stage::Sentiment, serde_json::to_value(&record.sentiment_analysis)?),
        (Stage::Summarize, Value::String(record.summary.clone())),
        (Stage::ExtractActions, serde_json::to_value(&record.actions)?),
        (Stage::RetrieveKnowledge, serde_json::to_value(&record.knowledge_articles)?),
        (Stage::Route, serde_json::to_value(&record.routing)?),
        (
            Stage::Embed,
            serde_json::json!({
                "model": embedding.vector.model,
                "dimension": embedding.vector.dimension(),
            }),
        ),
        (Stage::Similarity, serde_json::to_value(&record.similar_conversations)?),
        (Stage::Recommend, serde_json::to_value(&record.recommendations)?),
        (Stage::PredictTime, serde_json::to_value(&record.time_prediction)?),
    ])
}

#[async_trait::async_trait]
impl RecordStore for SqlRecordStore {
    async fn save(
        &self,
        conversation: &Conversation,
        record: &ProcessingRecord,
        embedding: &StoredEmbedding,
    ) -> Result<(), RepositoryError> {
        let record_json =
            serde_json::to_string(record).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let payloads =
            stage_payloads(record, embedding).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        let id = conversation.id().as_str();
        let metadata = conversation.metadata();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO conversations (id, category, reported_sentiment, priority, summary, record_json,
                                        processing_started_at, processing_total_secs, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 category = excluded.category,
                 reported_sentiment = excluded.reported_sentiment,
                 priority = excluded.priority,
                 summary = excluded.summary,
                 record_json = excluded.record_json,
                 processing_started_at = excluded.processing_started_at,
                 processing_total_secs = excluded.processing_total_secs,
                 updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(&metadata.category)
        .bind(&metadata.reported_sentiment)
        .bind(&metadata.priority)
        .bind(&record.summary)
        .bind(&record_json)
        .bind(record.processing_time.start.to_rfc3339())
        .bind(record.processing_time.total)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM conversation_turns WHERE conversation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (index, turn) in conversation.turns().iter().enumerate() {
            let turn_index =
                i64::try_from(index).map_err(|e| RepositoryError::Decode(e.to_string()))?;
            sqlx::query(
                "INSERT INTO conversation_turns (conversation_id, turn_index, speaker, content, spoken_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(turn_index)
            .bind(turn.speaker.as_str())
            .bind(&turn.text)
            .bind(&turn.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM stage_results WHERE conversation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (stage, payload) in &payloads {
            sqlx::query(
                "INSERT INTO stage_results (conversation_id, stage, parse_mode, elapsed_secs, result_json)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(stage.as_str())
            .bind(record.parse_modes.get(stage).copied().map(parse_mode_as_str))
            .bind(record.processing_time.steps.get(*stage))
            .bind(payload.to_string())
            .execute(&mut *tx)
            .await?;
        }

        upsert_embedding(&mut *tx, embedding).await?;

        tx.commit().await?;
        debug!(
            event_name = "db.record.saved",
            conversation_id = %id,
            turns = conversation.turns().len(),
            stage_rows = payloads.len(),
            "processing record persisted"
        );
        Ok(())
    }

    async fn find_record(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ProcessingRecord>, RepositoryError> {
        let record_json: Option<String> =
            sqlx::query_scalar("SELECT record_json FROM conversations WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        record_json
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    RepositoryError::Decode(format!("record for conversation `{id}`: {e}"))
                })
            })
            .transpose()
    }
}

#[async_trait::async_trait]
impl EmbeddingRepository for SqlRecordStore {
    async fn upsert(&self, embedding: &StoredEmbedding) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert_embedding(&mut conn, embedding).await
    }

    async fn list(
        &self,
        source_type: Option<&str>,
    ) -> Result<Vec<StoredEmbedding>, RepositoryError> {
        list_embeddings(&self.pool, source_type).await
    }
}
