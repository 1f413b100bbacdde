// ============================================
// Recommendation Engine
// ============================================
//
// Orchestrates the full pipeline for one request:
//
//   extract features -> update vector -> profile -> build context
//     -> fan out the four generators -> merge/rank/dedup -> select
//     -> append history -> assemble reasoning + next-update interval
//
// The engine owns no global state: every store and collaborator is injected
// at construction, with in-memory defaults for tests and single-process use.
// Only a store failure is fatal, and even that degrades to an empty,
// well-formed response instead of an error.

use crate::config::Config;
use crate::models::{
    Alarm, AlarmEvent, GenerationStats, PsychologicalProfile, RecommendationContext,
    RecommendationMetrics, RecommendationReasoning, RecommendationResponse,
};
use crate::services::context::build_context;
use crate::services::external::{
    CrossPlatformProvider, HeuristicPredictor, IdGenerator, NoopProvider, Predictor,
    UuidIdGenerator,
};
use crate::services::features::extract_features;
use crate::services::generators::{
    CandidateGenerator, CollaborativeGenerator, ContentBasedGenerator, ContextualGenerator,
    GeneratorLayer, HybridGenerator,
};
use crate::services::history::{
    compute_metrics, EngagementStore, HistoryStore, InMemoryEngagementStore, InMemoryHistoryStore,
};
use crate::services::profiler::BehavioralProfiler;
use crate::services::ranking::RankingLayer;
use crate::services::similarity::SimilarityIndex;
use crate::services::store::{InMemoryVectorStore, Result, VectorStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

pub struct RecommendationEngine {
    config: Config,
    vectors: Arc<dyn VectorStore>,
    history: Arc<dyn HistoryStore>,
    engagement: Arc<dyn EngagementStore>,
    profiler: BehavioralProfiler,
    generators: GeneratorLayer,
    ranking: RankingLayer,
}

impl RecommendationEngine {
    /// Engine with in-memory stores and default collaborators. Users with no
    /// connected platforms get the no-op provider.
    pub fn new(config: Config) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(NoopProvider),
            Arc::new(HeuristicPredictor),
            Arc::new(UuidIdGenerator),
        )
    }

    /// Engine with injected provider/predictor/ID source over in-memory
    /// stores.
    pub fn with_collaborators(
        config: Config,
        provider: Arc<dyn CrossPlatformProvider>,
        predictor: Arc<dyn Predictor>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let vectors: Arc<dyn VectorStore> =
            Arc::new(InMemoryVectorStore::new(config.features.clone()));
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::new(config.history.cap));
        let engagement: Arc<dyn EngagementStore> = Arc::new(InMemoryEngagementStore::new());
        Self::with_stores(config, vectors, history, engagement, provider, predictor, ids)
    }

    /// Engine over caller-supplied store backends, for hosts that bring a
    /// durable `VectorStore`/`HistoryStore`/`EngagementStore`.
    pub fn with_stores(
        config: Config,
        vectors: Arc<dyn VectorStore>,
        history: Arc<dyn HistoryStore>,
        engagement: Arc<dyn EngagementStore>,
        provider: Arc<dyn CrossPlatformProvider>,
        predictor: Arc<dyn Predictor>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let similarity = Arc::new(SimilarityIndex::new(vectors.clone()));

        let generators: Vec<Arc<dyn CandidateGenerator>> = vec![
            Arc::new(CollaborativeGenerator::new(
                similarity,
                history.clone(),
                engagement.clone(),
                ids.clone(),
                config.generation.clone(),
            )),
            Arc::new(ContentBasedGenerator::new(
                vectors.clone(),
                history.clone(),
                engagement.clone(),
                predictor,
                ids.clone(),
                config.generation.clone(),
            )),
            Arc::new(ContextualGenerator::new(ids.clone(), config.generation.clone())),
            Arc::new(HybridGenerator::new(
                provider,
                vectors.clone(),
                ids,
                config.generation.clone(),
            )),
        ];

        Self {
            profiler: BehavioralProfiler::new(config.profiler.clone()),
            generators: GeneratorLayer::new(generators, config.generation.generator_timeout_ms),
            ranking: RankingLayer::new(config.ranking.clone()),
            vectors,
            history,
            engagement,
            config,
        }
    }

    /// Run the whole pipeline for one user. Never errors: a total failure
    /// returns an empty list with the explanation in `reasoning`, so calling
    /// layers always receive a well-formed response.
    pub async fn generate_recommendations(
        &self,
        user_id: &str,
        alarms: &[Alarm],
        events: &[AlarmEvent],
        context_override: Option<RecommendationContext>,
    ) -> RecommendationResponse {
        self.generate(user_id, alarms, events, context_override, None)
            .await
    }

    /// Same pipeline under a caller-supplied deadline. The deadline caps the
    /// generator fan-out: strategies that finished keep their candidates in
    /// the merge, only the ones still running when it expires are dropped.
    pub async fn generate_recommendations_with_deadline(
        &self,
        user_id: &str,
        alarms: &[Alarm],
        events: &[AlarmEvent],
        context_override: Option<RecommendationContext>,
        deadline: std::time::Duration,
    ) -> RecommendationResponse {
        self.generate(user_id, alarms, events, context_override, Some(deadline))
            .await
    }

    async fn generate(
        &self,
        user_id: &str,
        alarms: &[Alarm],
        events: &[AlarmEvent],
        context_override: Option<RecommendationContext>,
        deadline: Option<std::time::Duration>,
    ) -> RecommendationResponse {
        match self
            .run_pipeline(user_id, alarms, events, context_override, deadline)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Pipeline failed, returning empty response");
                RecommendationResponse {
                    recommendations: Vec::new(),
                    reasoning: RecommendationReasoning {
                        primary_factors: vec![format!(
                            "Recommendations are temporarily unavailable: {}",
                            e
                        )],
                        ..Default::default()
                    },
                    next_update_in_minutes: self.config.cadence.idle_minutes,
                }
            }
        }
    }

    async fn run_pipeline(
        &self,
        user_id: &str,
        alarms: &[Alarm],
        events: &[AlarmEvent],
        context_override: Option<RecommendationContext>,
        deadline: Option<std::time::Duration>,
    ) -> Result<RecommendationResponse> {
        let started = std::time::Instant::now();
        let update = extract_features(alarms, events, &self.config.features);
        let vector = self.vectors.update(user_id, update).await?;
        let profile = self.profiler.build(&vector);

        let average_engagement = self.engagement.average(user_id).await?;
        let context = match context_override {
            Some(ctx) => ctx,
            None => build_context(Utc::now(), events, average_engagement),
        };

        let (candidates, stats) = match deadline {
            Some(total) => {
                let remaining = total.saturating_sub(started.elapsed());
                self.generators
                    .generate_all_within(user_id, &context, remaining)
                    .await
            }
            None => self.generators.generate_all(user_id, &context).await,
        };

        let ranked = self.ranking.merge_and_rank(candidates);
        let mut final_stats = stats;
        let selected = self.ranking.select(ranked, average_engagement);
        final_stats.final_count = selected.len();

        self.history.append(user_id, &selected).await?;

        let reasoning = self.build_reasoning(&profile, &context, &final_stats);
        let next_update_in_minutes = self.next_update_minutes(average_engagement);

        info!(
            user_id = %user_id,
            final_count = final_stats.final_count,
            average_engagement,
            next_update_in_minutes,
            "Recommendations generated"
        );

        Ok(RecommendationResponse {
            recommendations: selected,
            reasoning,
            next_update_in_minutes,
        })
    }

    fn build_reasoning(
        &self,
        profile: &PsychologicalProfile,
        context: &RecommendationContext,
        stats: &GenerationStats,
    ) -> RecommendationReasoning {
        let mut reasoning = RecommendationReasoning::default();

        reasoning.primary_factors.push(format!(
            "Chronotype assessed as {}",
            serde_json::to_value(profile.chronotype)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_else(|| "neither".to_string())
        ));
        reasoning.primary_factors.push(format!(
            "Stress response: {}, adaptability: {}",
            serde_json::to_value(profile.stress_response)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default(),
            serde_json::to_value(profile.change_adaptability)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default(),
        ));
        reasoning.primary_factors.push(format!(
            "Profile confidence {:.0}%",
            profile.confidence * 100.0
        ));

        if stats.collaborative_count > 0 {
            reasoning.collaborative_insights.push(format!(
                "{} suggestions came from users with similar wake-up patterns",
                stats.collaborative_count
            ));
        }
        if stats.content_based_count > 0 {
            reasoning.content_based_matches.push(format!(
                "{} suggestions follow what you engaged with before",
                stats.content_based_count
            ));
        }

        reasoning.contextual_adjustments.push(format!(
            "Tuned for the {} ({})",
            serde_json::to_value(context.time_of_day)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default(),
            serde_json::to_value(context.season)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default(),
        ));
        if context.stress_estimate > 0.7 {
            reasoning
                .contextual_adjustments
                .push("Recent mornings look stressful; calming suggestions were prioritized".to_string());
        }

        reasoning
    }

    /// Engaged users get a shorter refresh interval.
    fn next_update_minutes(&self, average_engagement: f32) -> u32 {
        let cadence = &self.config.cadence;
        if average_engagement > self.config.ranking.high_engagement_threshold {
            cadence.engaged_minutes
        } else if average_engagement > cadence.steady_threshold {
            cadence.steady_minutes
        } else {
            cadence.idle_minutes
        }
    }

    /// Engagement feedback entry point for UI/analytics layers. Upserts.
    pub async fn record_engagement(
        &self,
        user_id: &str,
        recommendation_id: &str,
        score: f32,
    ) -> Result<()> {
        self.engagement.record(user_id, recommendation_id, score).await
    }

    pub async fn average_engagement(&self, user_id: &str) -> Result<f32> {
        self.engagement.average(user_id).await
    }

    /// Observability aggregate for dashboards.
    pub async fn metrics(&self, user_id: &str) -> Result<RecommendationMetrics> {
        compute_metrics(user_id, self.history.as_ref(), self.engagement.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::external::{ExternalSnapshot, SequentialIdGenerator};
    use chrono::{Duration, TimeZone};

    fn engine() -> RecommendationEngine {
        RecommendationEngine::with_collaborators(
            Config::default(),
            Arc::new(NoopProvider),
            Arc::new(HeuristicPredictor),
            Arc::new(SequentialIdGenerator::new()),
        )
    }

    fn alarm(time: &str) -> Alarm {
        Alarm {
            id: "a1".to_string(),
            time: time.to_string(),
            enabled: true,
        }
    }

    fn events(n: usize, dismissed: bool, snoozed: bool) -> Vec<AlarmEvent> {
        (0..n)
            .map(|i| AlarmEvent {
                id: format!("e{}", i),
                alarm_id: "a1".to_string(),
                fired_at: Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap()
                    + Duration::days(i as i64),
                dismissed,
                snoozed,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_new_user_gets_bounded_nonempty_list() {
        let engine = engine();
        let response = engine
            .generate_recommendations("fresh", &[], &[], None)
            .await;

        assert!(!response.recommendations.is_empty());
        assert!(response.recommendations.len() <= 5);
        assert!(!response.reasoning.primary_factors.is_empty());
    }

    #[tokio::test]
    async fn test_engagement_raises_selector_bound_signal() {
        let engine = engine();
        let first = engine
            .generate_recommendations("u1", &[alarm("07:00")], &events(10, true, false), None)
            .await;
        let rec_id = first.recommendations[0].id.clone();

        let before = engine.average_engagement("u1").await.unwrap();
        engine.record_engagement("u1", &rec_id, 0.9).await.unwrap();
        let after = engine.average_engagement("u1").await.unwrap();

        assert!(after > before);
        // Above the 0.7 threshold, the refresh cadence tightens
        assert_eq!(engine.next_update_minutes(after), 360);
        assert_eq!(engine.next_update_minutes(before), 720);
    }

    struct SleepyProvider;

    #[async_trait::async_trait]
    impl CrossPlatformProvider for SleepyProvider {
        async fn fetch(&self, _user_id: &str) -> anyhow::Result<ExternalSnapshot> {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            Ok(ExternalSnapshot::default())
        }
    }

    #[tokio::test]
    async fn test_deadline_keeps_finished_strategies_drops_slow_ones() {
        let engine = RecommendationEngine::with_collaborators(
            Config::default(),
            Arc::new(SleepyProvider),
            Arc::new(HeuristicPredictor),
            Arc::new(SequentialIdGenerator::new()),
        );
        let response = engine
            .generate_recommendations_with_deadline(
                "u1",
                &[alarm("07:00")],
                &events(6, true, false),
                None,
                std::time::Duration::from_millis(100),
            )
            .await;

        // The provider outlives the deadline, but the time-of-day baseline
        // and the other finished strategies still make it into the response
        assert!(!response.recommendations.is_empty());
        assert!(!response.reasoning.primary_factors.is_empty());
        for rec in &response.recommendations {
            assert!(rec.is_well_formed());
        }
    }

    #[tokio::test]
    async fn test_caller_supplied_stores_back_the_pipeline() {
        let config = Config::default();
        let engagement = Arc::new(crate::services::history::InMemoryEngagementStore::new());
        engagement.record("u1", "earlier", 0.9).await.unwrap();
        let history = Arc::new(crate::services::history::InMemoryHistoryStore::new(
            config.history.cap,
        ));

        let engine = RecommendationEngine::with_stores(
            config.clone(),
            Arc::new(crate::services::store::InMemoryVectorStore::new(
                config.features.clone(),
            )),
            history,
            engagement,
            Arc::new(NoopProvider),
            Arc::new(HeuristicPredictor),
            Arc::new(SequentialIdGenerator::new()),
        );

        // Pre-existing engagement in the injected store drives the cadence
        assert!((engine.average_engagement("u1").await.unwrap() - 0.9).abs() < 1e-6);
        let response = engine
            .generate_recommendations("u1", &[alarm("07:00")], &events(6, true, false), None)
            .await;
        assert_eq!(response.next_update_in_minutes, 360);
        assert!(response.recommendations.len() <= 8);
    }

    #[tokio::test]
    async fn test_metrics_after_serving_and_rating() {
        let engine = engine();
        let response = engine
            .generate_recommendations("u1", &[alarm("06:30")], &events(8, true, false), None)
            .await;
        let rec_id = response.recommendations[0].id.clone();
        engine.record_engagement("u1", &rec_id, 0.8).await.unwrap();

        let metrics = engine.metrics("u1").await.unwrap();
        assert_eq!(metrics.total_recommendations, response.recommendations.len());
        assert!(metrics.average_engagement > 0.5);
        assert!(!metrics.category_performance.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_requests_accumulate_history() {
        let engine = engine();
        let first = engine
            .generate_recommendations("u1", &[alarm("07:00")], &events(6, true, false), None)
            .await;
        let second = engine
            .generate_recommendations("u1", &[alarm("07:00")], &events(6, true, false), None)
            .await;

        // Both runs are well-formed and bounded; later entries accrue in history
        assert!(!first.recommendations.is_empty());
        assert!(!second.recommendations.is_empty());
        let metrics = engine.metrics("u1").await.unwrap();
        assert_eq!(
            metrics.total_recommendations,
            first.recommendations.len() + second.recommendations.len()
        );
    }
}
