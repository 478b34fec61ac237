use chrono::NaiveDate;

use supportflow_core::domain::embedding::{EmbeddingVector, StoredEmbedding};
use supportflow_core::domain::history::HistoryGenerator;

use crate::repositories::{EmbeddingRepository, HistoricalTicketRepository, RepositoryError};

pub const SAMPLE_SOURCE_TYPE: &str = "sample";

/// Reference texts embedded at seed time so similarity lookup has neighbours on a fresh store.
pub const SAMPLE_EMBEDDING_TEXTS: &[&str] = &[
    "Customer having login issues with their account",
    "User can't reset their password",
    "Billing issues with duplicate charges",
    "Problems with product installation",
    "Feature request for new functionality",
];

/// Deterministic historical-ticket and sample-embedding seed.
pub struct SeedDataset {
    pub history_seed: u64,
    pub ticket_count: usize,
    pub anchor: NaiveDate,
}

impl Default for SeedDataset {
    fn default() -> Self {
        Self {
            history_seed: 42,
            ticket_count: 100,
            anchor: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap_or(NaiveDate::MIN),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub tickets_seeded: usize,
    pub embeddings_seeded: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

pub fn sample_source_id(index: usize) -> String {
    format!("sample-{index}")
}

impl SeedDataset {
    /// Pairs each sample text with its vector; `vectors` must follow `SAMPLE_EMBEDDING_TEXTS` order.
    pub fn sample_embeddings(
        vectors: impl IntoIterator<Item = EmbeddingVector>,
    ) -> Vec<StoredEmbedding> {
        SAMPLE_EMBEDDING_TEXTS
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (text, vector))| StoredEmbedding {
                source_type: SAMPLE_SOURCE_TYPE.to_string(),
                source_id: sample_source_id(index),
                text: (*text).to_string(),
                vector,
            })
            .collect()
    }

    pub async fn load(
        &self,
        tickets: &dyn HistoricalTicketRepository,
        embeddings: &dyn EmbeddingRepository,
        sample_vectors: Vec<EmbeddingVector>,
    ) -> Result<SeedResult, RepositoryError> {
        let generated =
            HistoryGenerator::new(self.history_seed, self.anchor).generate(self.ticket_count);
        tickets.save_all(&generated).await?;

        let samples = Self::sample_embeddings(sample_vectors);
        for sample in &samples {
            embeddings.upsert(sample).await?;
        }

        Ok(SeedResult { tickets_seeded: generated.len(), embeddings_seeded: samples.len() })
    }

    pub async fn verify(
        &self,
        tickets: &dyn HistoricalTicketRepository,
        embeddings: &dyn EmbeddingRepository,
    ) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let ticket_count = tickets.count().await?;
        checks.push(("historical-tickets", ticket_count >= self.ticket_count as u64));

        let samples = embeddings.list(Some(SAMPLE_SOURCE_TYPE)).await?;
        checks.push(("sample-embeddings", samples.len() == SAMPLE_EMBEDDING_TEXTS.len()));
        let texts_match = samples
            .iter()
            .zip(SAMPLE_EMBEDDING_TEXTS)
            .all(|(stored, expected)| stored.text == *expected);
        checks.push(("sample-embedding-texts", texts_match));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[cfg(test)]
mod tests {
    use supportflow_core::domain::embedding::EmbeddingVector;

    use super::{SeedDataset, SAMPLE_EMBEDDING_TEXTS};
    use crate::repositories::{EmbeddingRepository, InMemoryStore};

    fn vectors() -> Vec<EmbeddingVector> {
        (0..SAMPLE_EMBEDDING_TEXTS.len())
            .map(|i| EmbeddingVector::new("simulated", vec![i as f32, 1.0]).expect("vector"))
            .collect()
    }

    #[tokio::test]
    async fn load_then_verify_passes() {
        let store = InMemoryStore::default();
        let dataset = SeedDataset::default();

        let result = dataset.load(&store, &store, vectors()).await.expect("load");
        let verification = dataset.verify(&store, &store).await.expect("verify");

        assert_eq!(result.tickets_seeded, 100);
        assert_eq!(result.embeddings_seeded, 5);
        assert!(verification.all_present, "{:?}", verification.checks);
    }

    #[tokio::test]
    async fn verify_reports_missing_samples() {
        let store = InMemoryStore::default();
        let dataset = SeedDataset { ticket_count: 10, ..SeedDataset::default() };
        dataset.load(&store, &store, Vec::new()).await.expect("load without vectors");

        let verification = dataset.verify(&store, &store).await.expect("verify");

        assert!(!verification.all_present);
        assert!(verification.checks.contains(&("sample-embeddings", false)));
        assert!(store.list(None).await.expect("list").is_empty());
    }
}
