use super::{new_candidate, CandidateGenerator};
use crate::config::GenerationConfig;
use crate::models::{
    EstimatedImpact, GenerationSource, ImplementationComplexity, Priority, Recommendation,
    RecommendationCategory, RecommendationContext, RecommendationKind, Season, TimeOfDay,
};
use crate::services::external::IdGenerator;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Contextual strategy: stateless rules over the request context only.
/// Holds no per-user state, so a brand-new user still gets candidates;
/// the time-of-day baseline guarantees at least one.
pub struct ContextualGenerator {
    ids: Arc<dyn IdGenerator>,
    config: GenerationConfig,
}

impl ContextualGenerator {
    pub fn new(ids: Arc<dyn IdGenerator>, config: GenerationConfig) -> Self {
        Self { ids, config }
    }

    fn baseline(&self, context: &RecommendationContext) -> Recommendation {
        let (title, description, steps) = match context.time_of_day {
            TimeOfDay::EarlyMorning | TimeOfDay::Morning => (
                "Start the day with water and light",
                "A glass of water and a few minutes of daylight set up the morning",
                vec![
                    "Drink a glass of water after dismissing the alarm".to_string(),
                    "Open the curtains or step outside briefly".to_string(),
                ],
            ),
            TimeOfDay::Afternoon => (
                "Keep caffeine before mid-afternoon",
                "Late caffeine pushes tomorrow's wake-up later",
                vec!["Switch to water or decaf after 15:00".to_string()],
            ),
            TimeOfDay::Evening | TimeOfDay::Night => (
                "Begin winding down",
                "A consistent wind-down routine makes tomorrow's alarm easier",
                vec![
                    "Dim the lights an hour before bed".to_string(),
                    "Set tomorrow's alarm now".to_string(),
                ],
            ),
        };

        new_candidate(
            self.ids.as_ref(),
            self.config.validity_days,
            title,
            description,
            RecommendationCategory::SleepHygiene,
            Priority::Medium,
            0.55,
            "Suggested for this time of day".to_string(),
            EstimatedImpact {
                sleep_quality: 0.4,
                energy_level: 0.4,
                consistency: 0.3,
                ..Default::default()
            },
            ImplementationComplexity::Simple,
            RecommendationKind::Actionable { steps },
        )
    }
}

#[async_trait]
impl CandidateGenerator for ContextualGenerator {
    async fn generate(
        &self,
        user_id: &str,
        context: &RecommendationContext,
    ) -> Result<Vec<Recommendation>> {
        let mut candidates = vec![self.baseline(context)];

        if context.stress_estimate > 0.7 {
            candidates.push(new_candidate(
                self.ids.as_ref(),
                self.config.validity_days,
                "Take five minutes to decompress",
                "Short, deliberate breaks blunt a stressful stretch",
                RecommendationCategory::StressManagement,
                Priority::High,
                0.7,
                format!(
                    "Your recent mornings suggest elevated stress ({:.0}%)",
                    context.stress_estimate * 100.0
                ),
                EstimatedImpact {
                    wellbeing: 0.7,
                    sleep_quality: 0.4,
                    energy_level: 0.3,
                    ..Default::default()
                },
                ImplementationComplexity::Simple,
                RecommendationKind::Actionable {
                    steps: vec![
                        "Step away from screens for five minutes".to_string(),
                        "Try a slow breathing cycle".to_string(),
                    ],
                },
            ));
        }

        if context.alarm_performance < 0.5 {
            candidates.push(new_candidate(
                self.ids.as_ref(),
                self.config.validity_days,
                "Rebuild your dismissal streak",
                "Getting up on the first alarm for a few days resets the habit",
                RecommendationCategory::Consistency,
                Priority::High,
                0.65,
                "Recent alarms were snoozed or missed more often than not".to_string(),
                EstimatedImpact {
                    consistency: 0.8,
                    energy_level: 0.4,
                    sleep_quality: 0.3,
                    ..Default::default()
                },
                ImplementationComplexity::Moderate,
                RecommendationKind::Challenge {
                    goal: "Dismiss the first alarm 5 days in a row".to_string(),
                    duration_days: 5,
                    milestones: vec!["Day 1".to_string(), "Day 3".to_string(), "Day 5".to_string()],
                },
            ));
        }

        if context.energy_estimate < 0.4 {
            candidates.push(new_candidate(
                self.ids.as_ref(),
                self.config.validity_days,
                "Short walk for an energy reset",
                "Ten minutes of movement beats a third coffee",
                RecommendationCategory::Energy,
                Priority::Medium,
                0.6,
                "Energy has been running low lately".to_string(),
                EstimatedImpact {
                    energy_level: 0.7,
                    wellbeing: 0.4,
                    productivity: 0.3,
                    ..Default::default()
                },
                ImplementationComplexity::Simple,
                RecommendationKind::Actionable {
                    steps: vec!["Walk for ten minutes outdoors".to_string()],
                },
            ));
        }

        if context.season == Season::Winter
            && matches!(
                context.time_of_day,
                TimeOfDay::EarlyMorning | TimeOfDay::Morning
            )
        {
            candidates.push(new_candidate(
                self.ids.as_ref(),
                self.config.validity_days,
                "Use bright light on dark mornings",
                "Winter mornings lack the daylight your body clock expects",
                RecommendationCategory::Energy,
                Priority::Medium,
                0.6,
                "Dark-season mornings make waking harder for everyone".to_string(),
                EstimatedImpact {
                    energy_level: 0.6,
                    sleep_quality: 0.4,
                    wellbeing: 0.3,
                    ..Default::default()
                },
                ImplementationComplexity::Simple,
                RecommendationKind::Content {
                    media: crate::models::MediaReference {
                        media_type: "article".to_string(),
                        title: "Light exposure in winter".to_string(),
                        reference: "guides/winter-light".to_string(),
                    },
                },
            ));
        }

        info!(
            user_id = %user_id,
            candidate_count = candidates.len(),
            "Contextual generation completed"
        );

        Ok(candidates)
    }

    fn source(&self) -> GenerationSource {
        GenerationSource::Contextual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::external::SequentialIdGenerator;

    fn generator() -> ContextualGenerator {
        ContextualGenerator::new(
            Arc::new(SequentialIdGenerator::new()),
            GenerationConfig::default(),
        )
    }

    fn context() -> RecommendationContext {
        RecommendationContext {
            time_of_day: TimeOfDay::Morning,
            day_of_week: 1,
            season: Season::Summer,
            alarm_performance: 0.8,
            stress_estimate: 0.3,
            energy_estimate: 0.8,
            upcoming_events: Vec::new(),
            recent_engagement: 0.5,
        }
    }

    #[tokio::test]
    async fn test_always_emits_baseline() {
        let candidates = generator().generate("u1", &context()).await.unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.is_well_formed()));
    }

    #[tokio::test]
    async fn test_high_stress_adds_stress_candidate() {
        let mut ctx = context();
        ctx.stress_estimate = 0.85;
        let candidates = generator().generate("u1", &ctx).await.unwrap();
        assert!(candidates
            .iter()
            .any(|c| c.category == RecommendationCategory::StressManagement
                && c.priority == Priority::High));
    }

    #[tokio::test]
    async fn test_poor_performance_adds_consistency_challenge() {
        let mut ctx = context();
        ctx.alarm_performance = 0.2;
        let candidates = generator().generate("u1", &ctx).await.unwrap();
        assert!(candidates
            .iter()
            .any(|c| c.category == RecommendationCategory::Consistency
                && matches!(c.kind, RecommendationKind::Challenge { .. })));
    }

    #[tokio::test]
    async fn test_winter_morning_adds_light_content() {
        let mut ctx = context();
        ctx.season = Season::Winter;
        let candidates = generator().generate("u1", &ctx).await.unwrap();
        assert!(candidates
            .iter()
            .any(|c| matches!(c.kind, RecommendationKind::Content { .. })));
    }

    #[tokio::test]
    async fn test_calm_context_stays_minimal() {
        let candidates = generator().generate("u1", &context()).await.unwrap();
        // Only the time-of-day baseline fires
        assert_eq!(candidates.len(), 1);
    }
}
