use super::CandidateGenerator;
use crate::config::GenerationConfig;
use crate::models::{GenerationSource, Recommendation, RecommendationContext};
use crate::services::external::IdGenerator;
use crate::services::history::{EngagementStore, HistoryStore};
use crate::services::similarity::SimilarityIndex;
use crate::utils::{clamp01, normalize_title};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Collaborative-filtering strategy.
///
/// Algorithm:
/// 1. Find the top-K users most similar to the target (cosine over embeddings)
/// 2. Borrow recommendations those neighbors engaged with strongly (> 0.7)
/// 3. Skip anything whose normalized title the target has already seen
/// 4. Scale `confidence` by the neighbor similarity and rewrite the reason
///    to cite the similarity percentage; drop weak adaptations
pub struct CollaborativeGenerator {
    similarity: Arc<SimilarityIndex>,
    history: Arc<dyn HistoryStore>,
    engagement: Arc<dyn EngagementStore>,
    ids: Arc<dyn IdGenerator>,
    config: GenerationConfig,
}

impl CollaborativeGenerator {
    pub fn new(
        similarity: Arc<SimilarityIndex>,
        history: Arc<dyn HistoryStore>,
        engagement: Arc<dyn EngagementStore>,
        ids: Arc<dyn IdGenerator>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            similarity,
            history,
            engagement,
            ids,
            config,
        }
    }

    /// Re-stamp a borrowed neighbor recommendation for the target user.
    fn adapt(&self, mut rec: Recommendation, similarity: f32) -> Recommendation {
        let now = Utc::now();
        rec.id = self.ids.next_id();
        rec.confidence = clamp01(rec.confidence * similarity);
        rec.personalized_reason = format!(
            "Users {:.0}% similar to you found this valuable",
            similarity * 100.0
        );
        rec.created_at = now;
        rec.expires_at = now + Duration::days(self.config.validity_days.max(1));
        rec
    }
}

#[async_trait]
impl CandidateGenerator for CollaborativeGenerator {
    async fn generate(
        &self,
        user_id: &str,
        _context: &RecommendationContext,
    ) -> Result<Vec<Recommendation>> {
        let neighbors = self
            .similarity
            .top_k(user_id, self.config.similar_user_count)
            .await?;

        if neighbors.is_empty() {
            info!(user_id = %user_id, "Collaborative: no similar users, returning empty");
            return Ok(Vec::new());
        }

        // Titles the target has already been served, in normalized form
        let mut seen: HashSet<String> = self
            .history
            .get(user_id)
            .await?
            .iter()
            .map(|r| normalize_title(&r.title))
            .collect();

        let mut candidates: Vec<Recommendation> = Vec::new();

        for neighbor in &neighbors {
            if neighbor.similarity <= 0.0 {
                continue;
            }

            let scores: HashMap<String, f32> = self
                .engagement
                .records(&neighbor.user_id)
                .await?
                .into_iter()
                .map(|r| (r.recommendation_id, r.score))
                .collect();

            for rec in self.history.get(&neighbor.user_id).await? {
                let engaged = scores
                    .get(&rec.id)
                    .map(|s| *s > self.config.min_neighbor_engagement)
                    .unwrap_or(false);
                if !engaged {
                    continue;
                }

                let key = normalize_title(&rec.title);
                if seen.contains(&key) {
                    continue;
                }

                let adapted = self.adapt(rec, neighbor.similarity);
                if adapted.confidence <= self.config.min_adapted_confidence {
                    continue;
                }

                seen.insert(key);
                candidates.push(adapted);
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(self.config.collaborative_cap);

        info!(
            user_id = %user_id,
            neighbor_count = neighbors.len(),
            candidate_count = candidates.len(),
            "Collaborative generation completed"
        );

        Ok(candidates)
    }

    fn source(&self) -> GenerationSource {
        GenerationSource::Collaborative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::models::{
        EstimatedImpact, ImplementationComplexity, Priority, RecommendationCategory,
        RecommendationKind, Season, TimeOfDay,
    };
    use crate::services::external::SequentialIdGenerator;
    use crate::services::features::{FeatureUpdate, CONSISTENCY_SCORE, MORNING_PERSONALITY};
    use crate::services::history::{InMemoryEngagementStore, InMemoryHistoryStore};
    use crate::services::store::{InMemoryVectorStore, VectorStore};

    fn context() -> RecommendationContext {
        RecommendationContext {
            time_of_day: TimeOfDay::Morning,
            day_of_week: 1,
            season: Season::Summer,
            alarm_performance: 0.6,
            stress_estimate: 0.4,
            energy_estimate: 0.6,
            upcoming_events: Vec::new(),
            recent_engagement: 0.5,
        }
    }

    fn served(id: &str, title: &str, confidence: f32) -> Recommendation {
        let now = Utc::now();
        Recommendation {
            id: id.to_string(),
            title: title.to_string(),
            description: "desc".to_string(),
            category: RecommendationCategory::SleepHygiene,
            priority: Priority::High,
            confidence,
            personalized_reason: "original reason".to_string(),
            estimated_impact: EstimatedImpact::default(),
            complexity: ImplementationComplexity::Simple,
            kind: RecommendationKind::Actionable { steps: vec![] },
            created_at: now,
            expires_at: now + Duration::days(7),
        }
    }

    async fn setup() -> (
        CollaborativeGenerator,
        Arc<InMemoryHistoryStore>,
        Arc<InMemoryEngagementStore>,
    ) {
        let store = Arc::new(InMemoryVectorStore::new(FeatureConfig::default()));

        // Target and neighbor share nearly identical features
        for (user, score) in [("target", 0.9f32), ("neighbor", 0.88)] {
            let mut update = FeatureUpdate::default();
            update.values.insert(CONSISTENCY_SCORE.to_string(), score);
            update.values.insert(MORNING_PERSONALITY.to_string(), 0.8);
            store.update(user, update).await.unwrap();
        }

        let history = Arc::new(InMemoryHistoryStore::new(50));
        let engagement = Arc::new(InMemoryEngagementStore::new());
        let generator = CollaborativeGenerator::new(
            Arc::new(SimilarityIndex::new(store)),
            history.clone(),
            engagement.clone(),
            Arc::new(SequentialIdGenerator::new()),
            GenerationConfig::default(),
        );
        (generator, history, engagement)
    }

    #[tokio::test]
    async fn test_borrows_highly_engaged_neighbor_recommendations() {
        let (generator, history, engagement) = setup().await;

        history
            .append("neighbor", &[served("n1", "Dim lights before bed", 0.9)])
            .await
            .unwrap();
        engagement.record("neighbor", "n1", 0.95).await.unwrap();

        let candidates = generator.generate("target", &context()).await.unwrap();
        assert_eq!(candidates.len(), 1);
        // Fresh ID, similarity-scaled confidence, similarity cited in reason
        assert_ne!(candidates[0].id, "n1");
        assert!(candidates[0].confidence > 0.5 && candidates[0].confidence < 0.9);
        assert!(candidates[0].personalized_reason.contains("similar"));
    }

    #[tokio::test]
    async fn test_skips_titles_target_already_saw() {
        let (generator, history, engagement) = setup().await;

        history
            .append("neighbor", &[served("n1", "Dim lights before bed", 0.9)])
            .await
            .unwrap();
        engagement.record("neighbor", "n1", 0.95).await.unwrap();
        history
            .append("target", &[served("t1", "DIM LIGHTS before bed!", 0.7)])
            .await
            .unwrap();

        let candidates = generator.generate("target", &context()).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_skips_weakly_engaged_entries() {
        let (generator, history, engagement) = setup().await;

        history
            .append("neighbor", &[served("n1", "Dim lights before bed", 0.9)])
            .await
            .unwrap();
        engagement.record("neighbor", "n1", 0.4).await.unwrap();

        let candidates = generator.generate("target", &context()).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_yields_empty() {
        let (generator, _, _) = setup().await;
        let candidates = generator.generate("stranger", &context()).await.unwrap();
        assert!(candidates.is_empty());
    }
}
