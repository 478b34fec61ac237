use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use supportflow_core::domain::embedding::{EmbeddingVector, StoredEmbedding};

use super::{EmbeddingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmbeddingRepository {
    pool: DbPool,
}

impl SqlEmbeddingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Upserts on `(source_type, source_id)`; the row id, and so the insertion order, is kept.
pub(crate) async fn upsert_embedding(
    conn: &mut SqliteConnection,
    embedding: &StoredEmbedding,
) -> Result<(), RepositoryError> {
    let vector_json = serde_json::to_string(&embedding.vector.values)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let dimension = i64::try_from(embedding.vector.dimension())
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    sqlx::query(
        "INSERT INTO embeddings (source_type, source_id, text, model, dimension, vector_json, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(source_type, source_id) DO UPDATE SET
             text = excluded.text,
             model = excluded.model,
             dimension = excluded.dimension,
             vector_json = excluded.vector_json",
    )
    .bind(&embedding.source_type)
    .bind(&embedding.source_id)
    .bind(&embedding.text)
    .bind(&embedding.vector.model)
    .bind(dimension)
    .bind(vector_json)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn row_to_embedding(row: &SqliteRow) -> Result<StoredEmbedding, RepositoryError> {
    let source_type: String =
        row.try_get("source_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let source_id: String =
        row.try_get("source_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let text: String = row.try_get("text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let model: String = row.try_get("model").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let vector_json: String =
        row.try_get("vector_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let values: Vec<f32> = serde_json::from_str(&vector_json)
        .map_err(|e| RepositoryError::Decode(format!("embedding `{source_id}`: {e}")))?;
    let vector = EmbeddingVector::new(model, values)
        .map_err(|e| RepositoryError::Decode(format!("embedding `{source_id}`: {e}")))?;

    Ok(StoredEmbedding { source_type, source_id, text, vector })
}

pub(crate) async fn list_embeddings(
    pool: &DbPool,
    source_type: Option<&str>,
) -> Result<Vec<StoredEmbedding>, RepositoryError> {
    let rows: Vec<SqliteRow> = if let Some(source_type) = source_type {
        sqlx::query(
            "SELECT source_type, source_id, text, model, vector_json
             FROM embeddings WHERE source_type = ? ORDER BY id ASC",
        )
        .bind(source_type)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query(
            "SELECT source_type, source_id, text, model, vector_json
             FROM embeddings ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await?
    };

    rows.iter().map(row_to_embedding).collect::<Result<Vec<_>, _>>()
}

#[async_trait::async_trait]
impl EmbeddingRepository for SqlEmbeddingRepository {
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

#[cfg(test)]
mod tests {
    use supportflow_core::domain::embedding::{EmbeddingVector, StoredEmbedding};

    use super::SqlEmbeddingRepository;
    use crate::repositories::EmbeddingRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlEmbeddingRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlEmbeddingRepository::new(pool)
    }

    fn embedding(source_type: &str, id: &str, values: Vec<f32>) -> StoredEmbedding {
        StoredEmbedding {
            source_type: source_type.to_string(),
            source_id: id.to_string(),
            text: format!("text for {id}"),
            vector: EmbeddingVector::new("simulated", values).expect("vector"),
        }
    }

    #[tokio::test]
    async fn list_returns_insertion_order_and_filters_by_source_type() {
        let repo = setup().await;
        repo.upsert(&embedding("conversation", "conv-b", vec![1.0, 2.0])).await.expect("b");
        repo.upsert(&embedding("sample", "sample-0", vec![0.5, 0.5])).await.expect("sample");
        repo.upsert(&embedding("conversation", "conv-a", vec![3.0, 4.0])).await.expect("a");

        let all = repo.list(None).await.expect("list all");
        let ids: Vec<&str> = all.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(ids, vec!["conv-b", "sample-0", "conv-a"]);

        let conversations = repo.list(Some("conversation")).await.expect("list conversations");
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[1].vector.values, vec![3.0, 4.0]);
    }

    #[tokio::test]
    async fn upsert_replaces_vector_but_keeps_position() {
        let repo = setup().await;
        repo.upsert(&embedding("conversation", "conv-1", vec![1.0])).await.expect("first");
        repo.upsert(&embedding("conversation", "conv-2", vec![2.0])).await.expect("second");
        repo.upsert(&embedding("conversation", "conv-1", vec![9.0, 9.0])).await.expect("replace");

        let all = repo.list(None).await.expect("list");

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].source_id, "conv-1");
        assert_eq!(all[0].vector.dimension(), 2);
    }
}
