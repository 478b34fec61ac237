use tracing::warn;

use crate::domain::embedding::{EmbeddingVector, StoredEmbedding};
use crate::domain::results::SimilarConversation;

/// Ranks stored embeddings against a query vector.
///
/// The score is `1 / (1 + euclidean_distance)`: it decreases monotonically with
/// distance and is only meaningful as an ordering key. Candidates whose model or
/// dimension differs from the query are skipped rather than scored.
#[derive(Clone, Debug)]
pub struct SimilarityLookup {
    limit: usize,
}

impl SimilarityLookup {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn score(distance: f64) -> f64 {
        1.0 / (1.0 + distance)
    }

    /// Returns the top matches by descending score; equal scores keep candidate order.
    pub fn rank<'a, I>(
        &self,
        query: &EmbeddingVector,
        exclude_source_id: Option<&str>,
        candidates: I,
    ) -> Vec<SimilarConversation>
    where
        I: IntoIterator<Item = &'a StoredEmbedding>,
    {
        let mut scored: Vec<SimilarConversation> = candidates
            .into_iter()
            .filter(|candidate| Some(candidate.source_id.as_str()) != exclude_source_id)
            .filter_map(|candidate| match query.euclidean_distance(&candidate.vector) {
                Ok(distance) => Some(SimilarConversation {
                    source_id: candidate.source_id.clone(),
                    text: candidate.text.clone(),
                    similarity: Self::score(distance),
                }),
                Err(error) => {
                    warn!(
                        event_name = "similarity.candidate_skipped",
                        source_id = %candidate.source_id,
                        error = %error,
                        "skipping embedding that is not comparable with the query"
                    );
                    None
                }
            })
            .collect();

        scored.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
        scored.truncate(self.limit);
        scored
    }
}
