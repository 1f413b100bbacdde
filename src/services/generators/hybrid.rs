use super::{new_candidate, CandidateGenerator};
use crate::config::GenerationConfig;
use crate::models::{
    EstimatedImpact, GenerationSource, ImplementationComplexity, Priority, Recommendation,
    RecommendationCategory, RecommendationContext, RecommendationKind,
};
use crate::services::external::{CrossPlatformProvider, ExternalSnapshot, IdGenerator};
use crate::services::features::{
    CONSISTENCY_SCORE, MORNING_PERSONALITY, STRESS_RESILIENCE, WORK_LIFE_BALANCE,
};
use crate::services::store::VectorStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Hybrid strategy: cross-references external platform signals with the
/// user's own behavioral vector. A signal alone is not enough; candidates
/// fire only when the external data shows a problem the user's features say
/// they have capacity to act on (or is not already handling well).
///
/// The provider is best-effort: on timeout, error, or missing categories the
/// strategy contributes nothing and never blocks the other three.
pub struct HybridGenerator {
    provider: Arc<dyn CrossPlatformProvider>,
    vectors: Arc<dyn VectorStore>,
    ids: Arc<dyn IdGenerator>,
    config: GenerationConfig,
}

impl HybridGenerator {
    pub fn new(
        provider: Arc<dyn CrossPlatformProvider>,
        vectors: Arc<dyn VectorStore>,
        ids: Arc<dyn IdGenerator>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            vectors,
            ids,
            config,
        }
    }

    fn cross_reference(
        &self,
        snapshot: &ExternalSnapshot,
        features: &HashMap<String, f32>,
        context: &RecommendationContext,
    ) -> Vec<Recommendation> {
        let feature = |name: &str| features.get(name).copied().unwrap_or(0.5);
        let mut candidates = Vec::new();

        if let Some(health) = &snapshot.health {
            // Low measured sleep quality only matters if the user's routine is
            // otherwise solid; an inconsistent user gets consistency advice
            // from other strategies first.
            if let Some(quality) = health.sleep_quality {
                if quality < 0.6 && feature(CONSISTENCY_SCORE) > 0.6 {
                    candidates.push(new_candidate(
                        self.ids.as_ref(),
                        self.config.validity_days,
                        "Tune your sleep environment",
                        "Your schedule is consistent but measured sleep quality is low; the bedroom itself may be the lever",
                        RecommendationCategory::SleepHygiene,
                        Priority::High,
                        0.7,
                        format!(
                            "Health data shows sleep quality at {:.0}% despite a steady routine",
                            quality * 100.0
                        ),
                        EstimatedImpact {
                            sleep_quality: 0.8,
                            energy_level: 0.5,
                            wellbeing: 0.4,
                            ..Default::default()
                        },
                        ImplementationComplexity::Moderate,
                        RecommendationKind::Actionable {
                            steps: vec![
                                "Cool the bedroom a couple of degrees".to_string(),
                                "Check for light and noise leaks".to_string(),
                            ],
                        },
                    ));
                }
            }

            if let Some(stress) = health.stress_level {
                if stress > 0.7 && feature(STRESS_RESILIENCE) < 0.5 {
                    candidates.push(new_candidate(
                        self.ids.as_ref(),
                        self.config.validity_days,
                        "Plan a gentler wake-up tomorrow",
                        "Measured stress is high and snoozing spikes with it; a softer alarm and ten extra minutes help",
                        RecommendationCategory::StressManagement,
                        Priority::High,
                        0.65,
                        "Health data and your snooze pattern both point to stress".to_string(),
                        EstimatedImpact {
                            wellbeing: 0.6,
                            sleep_quality: 0.4,
                            consistency: 0.3,
                            ..Default::default()
                        },
                        ImplementationComplexity::Simple,
                        RecommendationKind::Actionable {
                            steps: vec!["Move tomorrow's alarm 10 minutes earlier and use a gradual tone".to_string()],
                        },
                    ));
                }
            }
        }

        if let Some(calendar) = &snapshot.calendar {
            let busy = calendar.busy_score.unwrap_or(0.0) > 0.7
                || calendar.events_today.unwrap_or(0) >= 5;
            if busy && feature(STRESS_RESILIENCE) < 0.6 {
                let first_event = calendar
                    .first_event_hour
                    .map(|h| format!("first event at {:02}:00", h))
                    .unwrap_or_else(|| "a packed calendar".to_string());
                candidates.push(new_candidate(
                    self.ids.as_ref(),
                    self.config.validity_days,
                    "Prepare tonight for a busy tomorrow",
                    "Laying out the morning the evening before takes pressure off a loaded day",
                    RecommendationCategory::Productivity,
                    Priority::Medium,
                    0.6,
                    format!("Your calendar shows {}", first_event),
                    EstimatedImpact {
                        productivity: 0.6,
                        wellbeing: 0.5,
                        consistency: 0.3,
                        ..Default::default()
                    },
                    ImplementationComplexity::Simple,
                    RecommendationKind::Actionable {
                        steps: vec![
                            "Lay out clothes and breakfast tonight".to_string(),
                            "Review tomorrow's first meeting before bed".to_string(),
                        ],
                    },
                ));
            }
        }

        if let Some(weather) = &snapshot.weather {
            let gloomy = weather
                .condition
                .as_deref()
                .map(|c| matches!(c, "rain" | "snow" | "overcast"))
                .unwrap_or(false);
            if gloomy && feature(MORNING_PERSONALITY) < 0.5 {
                candidates.push(new_candidate(
                    self.ids.as_ref(),
                    self.config.validity_days,
                    "Beat a gloomy morning",
                    "Dark weather makes a late chronotype later; bring the light indoors",
                    RecommendationCategory::Motivation,
                    Priority::Low,
                    0.55,
                    "Tomorrow's forecast is dark and mornings are not your strong suit".to_string(),
                    EstimatedImpact {
                        energy_level: 0.5,
                        wellbeing: 0.4,
                        ..Default::default()
                    },
                    ImplementationComplexity::Simple,
                    RecommendationKind::Actionable {
                        steps: vec!["Turn on bright lights right after the alarm".to_string()],
                    },
                ));
            }
        }

        if let Some(social) = &snapshot.social {
            let friends_active = social.friend_activity.unwrap_or(0.0) > 0.6;
            let not_challenging = social.shared_challenges.unwrap_or(0) == 0;
            if friends_active && not_challenging && context.recent_engagement > 0.4 {
                candidates.push(new_candidate(
                    self.ids.as_ref(),
                    self.config.validity_days,
                    "Join a friend challenge",
                    "Friends on the app are active; a shared streak keeps both of you honest",
                    RecommendationCategory::Motivation,
                    Priority::Medium,
                    0.6,
                    "Your friends have been active this week".to_string(),
                    EstimatedImpact {
                        consistency: 0.5,
                        wellbeing: 0.5,
                        energy_level: 0.3,
                        ..Default::default()
                    },
                    ImplementationComplexity::Simple,
                    RecommendationKind::Challenge {
                        goal: "Shared 7-day wake-up streak".to_string(),
                        duration_days: 7,
                        milestones: vec!["Day 3 together".to_string(), "Full week".to_string()],
                    },
                ));
            }
        }

        if let Some(productivity) = &snapshot.productivity {
            if let Some(focus) = productivity.focus_score {
                if focus < 0.5 && feature(WORK_LIFE_BALANCE) > 0.6 {
                    candidates.push(new_candidate(
                        self.ids.as_ref(),
                        self.config.validity_days,
                        "Front-load your hardest task",
                        "Focus metrics dipped even though your schedule is balanced; try moving deep work right after waking",
                        RecommendationCategory::Productivity,
                        Priority::Medium,
                        0.6,
                        format!("Focus tracking reports {:.0}% lately", focus * 100.0),
                        EstimatedImpact {
                            productivity: 0.7,
                            energy_level: 0.3,
                            ..Default::default()
                        },
                        ImplementationComplexity::Moderate,
                        RecommendationKind::Actionable {
                            steps: vec!["Schedule the hardest task within an hour of waking".to_string()],
                        },
                    ));
                }
            }
        }

        candidates
    }
}

#[async_trait]
impl CandidateGenerator for HybridGenerator {
    async fn generate(
        &self,
        user_id: &str,
        context: &RecommendationContext,
    ) -> Result<Vec<Recommendation>> {
        let timeout = std::time::Duration::from_millis(self.config.external_timeout_ms);
        let snapshot = match tokio::time::timeout(timeout, self.provider.fetch(user_id)).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(user_id = %user_id, error = %e, "Cross-platform provider failed, hybrid contributes nothing");
                return Ok(Vec::new());
            }
            Err(_) => {
                warn!(user_id = %user_id, "Cross-platform provider timed out, hybrid contributes nothing");
                return Ok(Vec::new());
            }
        };

        let vector = self.vectors.get(user_id).await?;
        let candidates = self.cross_reference(&snapshot, &vector.features, context);

        info!(
            user_id = %user_id,
            candidate_count = candidates.len(),
            "Hybrid generation completed"
        );

        Ok(candidates)
    }

    fn source(&self) -> GenerationSource {
        GenerationSource::Hybrid
    }
}
