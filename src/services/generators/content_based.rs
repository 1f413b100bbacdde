use super::{new_candidate, CandidateGenerator};
use crate::config::GenerationConfig;
use crate::models::{
    DataPoint, EstimatedImpact, GenerationSource, ImplementationComplexity, MediaReference,
    Priority, Recommendation, RecommendationCategory, RecommendationContext, RecommendationKind,
    UserVector,
};
use crate::services::external::{IdGenerator, Predictor};
use crate::services::features::{
    CONSISTENCY_SCORE, ENGAGEMENT_LEVEL, MORNING_PERSONALITY, STRESS_RESILIENCE,
    WORK_LIFE_BALANCE,
};
use crate::services::history::{EngagementStore, HistoryStore};
use crate::services::store::VectorStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Content-based strategy: mine the user's own served history plus the
/// engagement they reported, find their preferred category, complexity and
/// recommendation kind, and emit fresh candidates in exactly that shape
/// whenever the matching behavioral feature still leaves room for
/// improvement.
pub struct ContentBasedGenerator {
    vectors: Arc<dyn VectorStore>,
    history: Arc<dyn HistoryStore>,
    engagement: Arc<dyn EngagementStore>,
    predictor: Arc<dyn Predictor>,
    ids: Arc<dyn IdGenerator>,
    config: GenerationConfig,
}

/// Cumulative engagement with a most-recent tiebreak.
#[derive(Debug, Clone, Copy)]
struct PreferenceScore {
    total: f32,
    latest: DateTime<Utc>,
}

impl ContentBasedGenerator {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        history: Arc<dyn HistoryStore>,
        engagement: Arc<dyn EngagementStore>,
        predictor: Arc<dyn Predictor>,
        ids: Arc<dyn IdGenerator>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            vectors,
            history,
            engagement,
            predictor,
            ids,
            config,
        }
    }

    fn accumulate<K: std::hash::Hash + Eq>(
        prefs: &mut HashMap<K, PreferenceScore>,
        key: K,
        score: f32,
        at: DateTime<Utc>,
    ) {
        let entry = prefs.entry(key).or_insert(PreferenceScore {
            total: 0.0,
            latest: at,
        });
        entry.total += score;
        if at > entry.latest {
            entry.latest = at;
        }
    }

    fn winner<K: Copy>(prefs: &HashMap<K, PreferenceScore>) -> Option<K> {
        prefs
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.total
                    .partial_cmp(&b.total)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.latest.cmp(&b.latest))
            })
            .map(|(k, _)| *k)
    }

    /// The feature a category is gated on: the candidate is only worth
    /// emitting while this value sits below the improvement headroom.
    fn gating_value(category: RecommendationCategory, vector: &UserVector) -> f32 {
        let feature = |name: &str| vector.features.get(name).copied().unwrap_or(0.5);
        match category {
            RecommendationCategory::Productivity => feature(WORK_LIFE_BALANCE),
            RecommendationCategory::Consistency => feature(CONSISTENCY_SCORE),
            RecommendationCategory::StressManagement => feature(STRESS_RESILIENCE),
            RecommendationCategory::Energy | RecommendationCategory::Motivation => {
                feature(ENGAGEMENT_LEVEL)
            }
            RecommendationCategory::WakeUpTiming => feature(MORNING_PERSONALITY),
            RecommendationCategory::SleepHygiene => feature(CONSISTENCY_SCORE),
        }
    }

    fn template(
        category: RecommendationCategory,
        complexity: ImplementationComplexity,
    ) -> (&'static str, &'static str, EstimatedImpact) {
        match category {
            RecommendationCategory::Productivity => (
                "Protect your first focused hour",
                "Block the hour after waking for deep work before messages",
                EstimatedImpact {
                    productivity: 0.8,
                    energy_level: 0.3,
                    wellbeing: 0.3,
                    ..Default::default()
                },
            ),
            RecommendationCategory::Consistency | RecommendationCategory::WakeUpTiming => (
                "Anchor one wake-up time",
                "Keep the same alarm time every day of the week, weekends included",
                EstimatedImpact {
                    consistency: 0.9,
                    sleep_quality: 0.5,
                    energy_level: 0.4,
                    ..Default::default()
                },
            ),
            RecommendationCategory::StressManagement => (
                "Two-minute wind-down breathing",
                "A short breathing exercise before sleep lowers morning snoozing",
                EstimatedImpact {
                    wellbeing: 0.7,
                    sleep_quality: 0.5,
                    consistency: 0.3,
                    ..Default::default()
                },
            ),
            RecommendationCategory::Energy | RecommendationCategory::Motivation => (
                "Morning light within 30 minutes",
                "Bright light shortly after waking lifts energy through the day",
                EstimatedImpact {
                    energy_level: 0.7,
                    wellbeing: 0.4,
                    sleep_quality: 0.3,
                    ..Default::default()
                },
            ),
            RecommendationCategory::SleepHygiene => (
                "Screens off before bed",
                "Put screens away 30 minutes before sleep to fall asleep faster",
                match complexity {
                    // Complexity influences how ambitious the impact claim is
                    ImplementationComplexity::Simple => EstimatedImpact {
                        sleep_quality: 0.6,
                        energy_level: 0.4,
                        ..Default::default()
                    },
                    _ => EstimatedImpact {
                        sleep_quality: 0.7,
                        energy_level: 0.5,
                        wellbeing: 0.3,
                        ..Default::default()
                    },
                },
            ),
        }
    }

    fn steps_for(category: RecommendationCategory) -> Vec<String> {
        let steps: &[&str] = match category {
            RecommendationCategory::Productivity => &[
                "Silence notifications for 60 minutes after waking",
                "Write down one priority task the night before",
            ],
            RecommendationCategory::Consistency | RecommendationCategory::WakeUpTiming => &[
                "Pick one wake-up time and keep it all week",
                "Set the alarm before going to bed",
            ],
            RecommendationCategory::StressManagement => &[
                "Breathe in for 4 counts, out for 6",
                "Repeat for two minutes before lights out",
            ],
            RecommendationCategory::Energy | RecommendationCategory::Motivation => {
                &["Get outside light within 30 minutes of waking"]
            }
            RecommendationCategory::SleepHygiene => {
                &["Set a screens-off reminder 30 minutes before bed"]
            }
        };
        steps.iter().map(|s| s.to_string()).collect()
    }

    fn challenge_goal(category: RecommendationCategory) -> &'static str {
        match category {
            RecommendationCategory::Productivity => "Protect the first hour for 14 days",
            RecommendationCategory::Consistency | RecommendationCategory::WakeUpTiming => {
                "Wake at the same time for 14 days"
            }
            RecommendationCategory::StressManagement => {
                "Wind down before bed every night for two weeks"
            }
            RecommendationCategory::Energy | RecommendationCategory::Motivation => {
                "Morning light every day for two weeks"
            }
            RecommendationCategory::SleepHygiene => {
                "No screens in the last half hour for 14 nights"
            }
        }
    }

    fn media_for(category: RecommendationCategory) -> MediaReference {
        let (title, reference) = match category {
            RecommendationCategory::Productivity => {
                ("Designing a focused morning", "guides/focused-morning")
            }
            RecommendationCategory::Consistency | RecommendationCategory::WakeUpTiming => {
                ("The case for one wake-up time", "guides/steady-wake-time")
            }
            RecommendationCategory::StressManagement => (
                "Breathing your way to better mornings",
                "guides/wind-down-breathing",
            ),
            RecommendationCategory::Energy | RecommendationCategory::Motivation => {
                ("Why morning light matters", "guides/morning-light")
            }
            RecommendationCategory::SleepHygiene => ("Screens and sleep", "guides/screens-off"),
        };
        MediaReference {
            media_type: "article".to_string(),
            title: title.to_string(),
            reference: reference.to_string(),
        }
    }

    /// Build the payload in the user's preferred variant shape. `gate` is the
    /// current value of the category's gating feature, surfaced as the data
    /// point when the preferred shape is an insight.
    fn shape_kind(
        category: RecommendationCategory,
        preferred: &str,
        gate: f32,
    ) -> RecommendationKind {
        match preferred {
            "challenge" => RecommendationKind::Challenge {
                goal: Self::challenge_goal(category).to_string(),
                duration_days: 14,
                milestones: vec![
                    "Three days in".to_string(),
                    "One full week".to_string(),
                    "Two weeks done".to_string(),
                ],
            },
            "content" => RecommendationKind::Content {
                media: Self::media_for(category),
            },
            "insight" => RecommendationKind::Insight {
                data_points: vec![DataPoint {
                    label: format!("current {}", category.as_str().replace('_', " ")),
                    value: gate,
                }],
            },
            _ => RecommendationKind::Actionable {
                steps: Self::steps_for(category),
            },
        }
    }
}

#[async_trait]
impl CandidateGenerator for ContentBasedGenerator {
    async fn generate(
        &self,
        user_id: &str,
        _context: &RecommendationContext,
    ) -> Result<Vec<Recommendation>> {
        let served = self.history.get(user_id).await?;
        if served.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.engagement.records(user_id).await?;
        let scores: HashMap<&str, (f32, DateTime<Utc>)> = records
            .iter()
            .map(|r| (r.recommendation_id.as_str(), (r.score, r.recorded_at)))
            .collect();

        let mut category_prefs: HashMap<RecommendationCategory, PreferenceScore> = HashMap::new();
        let mut complexity_prefs: HashMap<ImplementationComplexity, PreferenceScore> =
            HashMap::new();
        let mut kind_prefs: HashMap<&'static str, PreferenceScore> = HashMap::new();

        for rec in &served {
            if let Some((score, at)) = scores.get(rec.id.as_str()) {
                Self::accumulate(&mut category_prefs, rec.category, *score, *at);
                Self::accumulate(&mut complexity_prefs, rec.complexity, *score, *at);
                Self::accumulate(&mut kind_prefs, rec.kind.as_str(), *score, *at);
            }
        }

        let Some(category) = Self::winner(&category_prefs) else {
            // History exists but nothing was ever rated
            return Ok(Vec::new());
        };
        let complexity =
            Self::winner(&complexity_prefs).unwrap_or(ImplementationComplexity::Simple);
        let preferred_kind = Self::winner(&kind_prefs).unwrap_or("actionable");

        let vector = self.vectors.get(user_id).await?;

        let mut candidates = Vec::new();

        let state = Self::gating_value(category, &vector);
        if state < self.config.improvement_headroom {
            let (title, description, impact) = Self::template(category, complexity);
            let kind = Self::shape_kind(category, preferred_kind, state);
            candidates.push(new_candidate(
                self.ids.as_ref(),
                self.config.validity_days,
                title,
                description,
                category,
                Priority::Medium,
                0.65,
                format!(
                    "You engage most with {} suggestions and there is still headroom here",
                    category.as_str().replace('_', " ")
                ),
                impact,
                complexity,
                kind,
            ));
        }

        // Surface mined risk factors as an insight when the predictor sees any
        let risks = self.predictor.risk_factors(&vector);
        if !risks.is_empty() {
            let forecast = self.predictor.sleep_quality_forecast(&vector);
            candidates.push(new_candidate(
                self.ids.as_ref(),
                self.config.validity_days,
                "Patterns worth watching",
                "A few recent patterns are working against your mornings",
                RecommendationCategory::SleepHygiene,
                Priority::Medium,
                0.6,
                format!("Based on {} rated recommendations", records.len()),
                EstimatedImpact {
                    sleep_quality: 0.5,
                    wellbeing: 0.4,
                    ..Default::default()
                },
                ImplementationComplexity::Simple,
                RecommendationKind::Insight {
                    data_points: risks
                        .into_iter()
                        .map(|label| DataPoint {
                            label,
                            value: forecast,
                        })
                        .collect(),
                },
            ));
        }

        info!(
            user_id = %user_id,
            preferred_category = category.as_str(),
            candidate_count = candidates.len(),
            "Content-based generation completed"
        );

        Ok(candidates)
    }

    fn source(&self) -> GenerationSource {
        GenerationSource::ContentBased
    }
}
