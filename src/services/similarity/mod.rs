// ============================================
// Similarity Index
// ============================================
//
// Collaborative-filtering substrate: cosine similarity over user embeddings,
// top-K nearest-neighbor scan across a store snapshot. The scan reads a
// point-in-time copy, so results may lag concurrent vector updates.

use crate::services::store::{Result, VectorStore};
use std::sync::Arc;
use tracing::debug;

/// A neighbor of the query user, with its similarity score.
#[derive(Debug, Clone)]
pub struct SimilarUser {
    pub user_id: String,
    pub similarity: f32,
}

/// Cosine similarity between two embeddings.
///
/// Degrades instead of failing: mismatched lengths or a zero vector yield
/// 0.0, since an invariant violation should not crash a best-effort ranker.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub struct SimilarityIndex {
    store: Arc<dyn VectorStore>,
}

impl SimilarityIndex {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Top-K other users most similar to `user_id`, descending by cosine
    /// similarity. Users the index has never seen return an empty list.
    pub async fn top_k(&self, user_id: &str, k: usize) -> Result<Vec<SimilarUser>> {
        let snapshot = self.store.snapshot().await?;

        let query = match snapshot.iter().find(|v| v.user_id == user_id) {
            Some(vector) => vector.embedding.clone(),
            None => return Ok(Vec::new()),
        };

        let mut neighbors: Vec<SimilarUser> = snapshot
            .iter()
            .filter(|v| v.user_id != user_id)
            .map(|v| SimilarUser {
                user_id: v.user_id.clone(),
                similarity: cosine_similarity(&query, &v.embedding),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);

        debug!(
            user_id = %user_id,
            neighbor_count = neighbors.len(),
            top_similarity = neighbors.first().map(|n| n.similarity),
            "Similarity scan completed"
        );

        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::services::features::{FeatureUpdate, CONSISTENCY_SCORE, MORNING_PERSONALITY};
    use crate::services::store::InMemoryVectorStore;

    #[test]
    fn test_cosine_symmetric_and_bounded() {
        let a = vec![0.8, 0.2, 0.5, 0.1];
        let b = vec![0.1, 0.9, 0.4, 0.7];
        let ab = cosine_similarity(&a, &b);
        let ba = cosine_similarity(&b, &a);
        assert_eq!(ab, ba);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_cosine_self_similarity_is_one() {
        let a = vec![0.3, 0.6, 0.1];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_dimension_mismatch_is_zero() {
        let a = vec![0.3, 0.6, 0.1];
        let b = vec![0.3, 0.6];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![0.3, 0.6, 0.1];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[tokio::test]
    async fn test_top_k_ranks_closest_first() {
        let store = Arc::new(InMemoryVectorStore::new(FeatureConfig::default()));

        let seed = |score: f32| {
            let mut update = FeatureUpdate::default();
            update.values.insert(CONSISTENCY_SCORE.to_string(), score);
            update
                .values
                .insert(MORNING_PERSONALITY.to_string(), score);
            update
        };

        use crate::services::store::VectorStore;
        store.update("query", seed(0.9)).await.unwrap();
        store.update("close", seed(0.88)).await.unwrap();
        store.update("far", seed(0.1)).await.unwrap();

        let index = SimilarityIndex::new(store);
        let neighbors = index.top_k("query", 2).await.unwrap();

        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].user_id, "close");
        assert!(neighbors[0].similarity > neighbors[1].similarity);
    }

    #[tokio::test]
    async fn test_top_k_unknown_user_empty() {
        let store = Arc::new(InMemoryVectorStore::new(FeatureConfig::default()));
        let index = SimilarityIndex::new(store);
        assert!(index.top_k("ghost", 5).await.unwrap().is_empty());
    }
}
