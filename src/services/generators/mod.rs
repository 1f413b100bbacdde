// ============================================
// Candidate Generators
// ============================================
//
// Four independent strategies behind one contract. Each strategy may return
// an empty list and must not fail the request for recoverable conditions;
// the layer runs them concurrently, drops the ones that error or outrun
// their budget, and validates every surviving candidate before the merge.

mod collaborative;
mod content_based;
mod contextual;
mod hybrid;

pub use collaborative::CollaborativeGenerator;
pub use content_based::ContentBasedGenerator;
pub use contextual::ContextualGenerator;
pub use hybrid::HybridGenerator;

use crate::models::{
    EstimatedImpact, GenerationSource, GenerationStats, ImplementationComplexity, Priority,
    Recommendation, RecommendationCategory, RecommendationContext, RecommendationKind,
};
use crate::services::external::IdGenerator;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Strategy contract: emit zero or more candidates for a user and context.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    async fn generate(
        &self,
        user_id: &str,
        context: &RecommendationContext,
    ) -> Result<Vec<Recommendation>>;

    fn source(&self) -> GenerationSource;
}

/// Stamp a fresh candidate with a new ID and validity window.
#[allow(clippy::too_many_arguments)]
pub(crate) fn new_candidate(
    ids: &dyn IdGenerator,
    validity_days: i64,
    title: &str,
    description: &str,
    category: RecommendationCategory,
    priority: Priority,
    confidence: f32,
    reason: String,
    impact: EstimatedImpact,
    complexity: ImplementationComplexity,
    kind: RecommendationKind,
) -> Recommendation {
    let now = Utc::now();
    Recommendation {
        id: ids.next_id(),
        title: title.to_string(),
        description: description.to_string(),
        category,
        priority,
        confidence,
        personalized_reason: reason,
        estimated_impact: impact,
        complexity,
        kind,
        created_at: now,
        expires_at: now + Duration::days(validity_days.max(1)),
    }
}

/// Fan-out/fan-in orchestration of all strategies.
pub struct GeneratorLayer {
    generators: Vec<Arc<dyn CandidateGenerator>>,
    /// Budget per generator; a late strategy is dropped from the merge.
    timeout: std::time::Duration,
}

impl GeneratorLayer {
    pub fn new(generators: Vec<Arc<dyn CandidateGenerator>>, timeout_ms: u64) -> Self {
        Self {
            generators,
            timeout: std::time::Duration::from_millis(timeout_ms),
        }
    }

    /// Run every strategy concurrently and merge their outputs. Per-strategy
    /// failures and timeouts degrade to empty contributions; malformed
    /// candidates are dropped here with a data-quality warning.
    pub async fn generate_all(
        &self,
        user_id: &str,
        context: &RecommendationContext,
    ) -> (Vec<Recommendation>, GenerationStats) {
        self.generate_within(user_id, context, self.timeout).await
    }

    /// Fan-out with the per-strategy budget capped by the caller's remaining
    /// deadline. Strategies that finish inside the budget keep their output
    /// in the merge; only the ones still running when it expires are dropped.
    pub async fn generate_all_within(
        &self,
        user_id: &str,
        context: &RecommendationContext,
        deadline: std::time::Duration,
    ) -> (Vec<Recommendation>, GenerationStats) {
        self.generate_within(user_id, context, self.timeout.min(deadline))
            .await
    }

    async fn generate_within(
        &self,
        user_id: &str,
        context: &RecommendationContext,
        budget: std::time::Duration,
    ) -> (Vec<Recommendation>, GenerationStats) {
        let runs = self.generators.iter().map(|generator| {
            let source = generator.source();
            async move {
                let outcome =
                    tokio::time::timeout(budget, generator.generate(user_id, context)).await;
                (source, outcome)
            }
        });

        let mut stats = GenerationStats::default();
        let mut candidates: Vec<Recommendation> = Vec::new();

        for (source, outcome) in join_all(runs).await {
            let batch = match outcome {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    warn!(user_id = %user_id, source = source.as_str(), error = %e, "Generator failed, contributing nothing");
                    Vec::new()
                }
                Err(_) => {
                    warn!(user_id = %user_id, source = source.as_str(), "Generator timed out, dropped from merge");
                    Vec::new()
                }
            };

            let mut kept = 0;
            for candidate in batch {
                if candidate.is_well_formed() {
                    candidates.push(candidate);
                    kept += 1;
                } else {
                    stats.dropped_malformed += 1;
                    warn!(user_id = %user_id, source = source.as_str(), "Dropped malformed candidate");
                }
            }

            match source {
                GenerationSource::Collaborative => stats.collaborative_count = kept,
                GenerationSource::ContentBased => stats.content_based_count = kept,
                GenerationSource::Contextual => stats.contextual_count = kept,
                GenerationSource::Hybrid => stats.hybrid_count = kept,
            }
        }

        stats.total_candidates = candidates.len();

        info!(
            user_id = %user_id,
            collaborative = stats.collaborative_count,
            content_based = stats.content_based_count,
            contextual = stats.contextual_count,
            hybrid = stats.hybrid_count,
            dropped = stats.dropped_malformed,
            "Candidate generation completed"
        );

        (candidates, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Season, TimeOfDay};
    use crate::services::external::SequentialIdGenerator;

    fn context() -> RecommendationContext {
        RecommendationContext {
            time_of_day: TimeOfDay::Morning,
            day_of_week: 2,
            season: Season::Spring,
            alarm_performance: 0.6,
            stress_estimate: 0.4,
            energy_estimate: 0.6,
            upcoming_events: Vec::new(),
            recent_engagement: 0.5,
        }
    }

    struct FixedGenerator {
        source: GenerationSource,
        batch: Vec<Recommendation>,
    }

    #[async_trait]
    impl CandidateGenerator for FixedGenerator {
        async fn generate(
            &self,
            _user_id: &str,
            _context: &RecommendationContext,
        ) -> Result<Vec<Recommendation>> {
            Ok(self.batch.clone())
        }

        fn source(&self) -> GenerationSource {
            self.source
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl CandidateGenerator for FailingGenerator {
        async fn generate(
            &self,
            _user_id: &str,
            _context: &RecommendationContext,
        ) -> Result<Vec<Recommendation>> {
            anyhow::bail!("provider unreachable")
        }

        fn source(&self) -> GenerationSource {
            GenerationSource::Hybrid
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl CandidateGenerator for SlowGenerator {
        async fn generate(
            &self,
            _user_id: &str,
            _context: &RecommendationContext,
        ) -> Result<Vec<Recommendation>> {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        fn source(&self) -> GenerationSource {
            GenerationSource::Collaborative
        }
    }

    fn sample(ids: &dyn IdGenerator, title: &str, confidence: f32) -> Recommendation {
        new_candidate(
            ids,
            7,
            title,
            "desc",
            RecommendationCategory::Consistency,
            Priority::Medium,
            confidence,
            "reason".to_string(),
            EstimatedImpact::default(),
            ImplementationComplexity::Simple,
            RecommendationKind::Actionable { steps: vec![] },
        )
    }

    #[tokio::test]
    async fn test_failing_generator_does_not_abort_others() {
        let ids = SequentialIdGenerator::new();
        let layer = GeneratorLayer::new(
            vec![
                Arc::new(FixedGenerator {
                    source: GenerationSource::Contextual,
                    batch: vec![sample(&ids, "keep a routine", 0.7)],
                }),
                Arc::new(FailingGenerator),
            ],
            1_000,
        );

        let (candidates, stats) = layer.generate_all("u1", &context()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(stats.contextual_count, 1);
        assert_eq!(stats.hybrid_count, 0);
    }

    #[tokio::test]
    async fn test_slow_generator_dropped_on_timeout() {
        let ids = SequentialIdGenerator::new();
        let layer = GeneratorLayer::new(
            vec![
                Arc::new(SlowGenerator),
                Arc::new(FixedGenerator {
                    source: GenerationSource::Contextual,
                    batch: vec![sample(&ids, "still here", 0.7)],
                }),
            ],
            50,
        );

        let (candidates, stats) = layer.generate_all("u1", &context()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(stats.collaborative_count, 0);
    }

    #[tokio::test]
    async fn test_caller_deadline_keeps_completed_strategies() {
        let ids = SequentialIdGenerator::new();
        // Generous per-strategy budget; the caller's deadline is the binding cap
        let layer = GeneratorLayer::new(
            vec![
                Arc::new(SlowGenerator),
                Arc::new(FixedGenerator {
                    source: GenerationSource::Contextual,
                    batch: vec![sample(&ids, "already done", 0.7)],
                }),
            ],
            5_000,
        );

        let (candidates, stats) = layer
            .generate_all_within("u1", &context(), std::time::Duration::from_millis(50))
            .await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(stats.contextual_count, 1);
        assert_eq!(stats.collaborative_count, 0);
    }

    #[tokio::test]
    async fn test_malformed_candidates_dropped_at_boundary() {
        let ids = SequentialIdGenerator::new();
        let mut bad = sample(&ids, "bad", 0.7);
        bad.confidence = 2.0;

        let layer = GeneratorLayer::new(
            vec![Arc::new(FixedGenerator {
                source: GenerationSource::ContentBased,
                batch: vec![bad, sample(&ids, "good", 0.6)],
            })],
            1_000,
        );

        let (candidates, stats) = layer.generate_all("u1", &context()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(stats.dropped_malformed, 1);
        assert_eq!(stats.content_based_count, 1);
    }
}
