use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Behavioral fingerprint for a single user.
///
/// `features` holds named scores (most in `[0, 1]`, trend deltas signed);
/// `embedding` is the fixed-length vectorization used for similarity search.
/// The embedding length is constant across all users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVector {
    pub user_id: String,
    pub features: HashMap<String, f32>,
    pub embedding: Vec<f32>,
    /// Total alarm events observed for this user, drives profile confidence.
    pub observed_events: u32,
    pub last_updated: DateTime<Utc>,
}

/// Alarm definition as supplied by the alarm/event collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    /// Scheduled clock time, "HH:MM".
    pub time: String,
    pub enabled: bool,
}

impl Alarm {
    /// Parse the scheduled hour, if the time string is well-formed.
    pub fn hour(&self) -> Option<u8> {
        let (h, _) = self.time.split_once(':')?;
        h.parse::<u8>().ok().filter(|h| *h < 24)
    }
}

/// One firing of an alarm and how the user responded to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub id: String,
    pub alarm_id: String,
    pub fired_at: DateTime<Utc>,
    pub dismissed: bool,
    pub snoozed: bool,
}

/// Sleep/wake timing preference classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chronotype {
    ExtremeMorning,
    Morning,
    Neither,
    Evening,
    ExtremeEvening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressResponse {
    HighResilience,
    ModerateResilience,
    LowResilience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptabilityLevel {
    High,
    Moderate,
    Low,
}

/// Big-five style trait scores, each in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitScores {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
}

/// Motivational factor scores, each in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotivationalFactors {
    pub achievement: f32,
    pub autonomy: f32,
    pub mastery: f32,
    pub purpose: f32,
    pub social: f32,
}

/// Derived psychological profile. Read-only outside the profiler; used to
/// personalize message tone, never for ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsychologicalProfile {
    pub user_id: String,
    pub traits: TraitScores,
    pub motivation: MotivationalFactors,
    pub chronotype: Chronotype,
    pub stress_response: StressResponse,
    pub change_adaptability: AdaptabilityLevel,
    /// Rises monotonically with observed events, capped at 0.9.
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    WakeUpTiming,
    SleepHygiene,
    Consistency,
    StressManagement,
    Productivity,
    Energy,
    Motivation,
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::WakeUpTiming => "wake_up_timing",
            RecommendationCategory::SleepHygiene => "sleep_hygiene",
            RecommendationCategory::Consistency => "consistency",
            RecommendationCategory::StressManagement => "stress_management",
            RecommendationCategory::Productivity => "productivity",
            RecommendationCategory::Energy => "energy",
            RecommendationCategory::Motivation => "motivation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationComplexity {
    Simple,
    Moderate,
    Complex,
}

/// Per-dimension impact estimate, each field in `[0, 1]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimatedImpact {
    pub sleep_quality: f32,
    pub energy_level: f32,
    pub consistency: f32,
    pub wellbeing: f32,
    pub productivity: f32,
}

impl EstimatedImpact {
    pub fn sum(&self) -> f32 {
        self.sleep_quality + self.energy_level + self.consistency + self.wellbeing + self.productivity
    }
}

/// Supporting evidence attached to an insight recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f32,
}

/// Media reference carried by a content recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaReference {
    pub media_type: String,
    pub title: String,
    pub reference: String,
}

/// Variant-specific payload of a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecommendationKind {
    Actionable { steps: Vec<String> },
    Insight { data_points: Vec<DataPoint> },
    Challenge { goal: String, duration_days: u32, milestones: Vec<String> },
    Content { media: MediaReference },
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Actionable { .. } => "actionable",
            RecommendationKind::Insight { .. } => "insight",
            RecommendationKind::Challenge { .. } => "challenge",
            RecommendationKind::Content { .. } => "content",
        }
    }
}

/// A single ranked, explainable recommendation.
///
/// Instances are ephemeral: generated fresh per request, immutable once
/// returned, persisted only inside the recommendation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Unique per emission, not stable across regenerations.
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: RecommendationCategory,
    pub priority: Priority,
    pub confidence: f32,
    pub personalized_reason: String,
    pub estimated_impact: EstimatedImpact,
    pub complexity: ImplementationComplexity,
    #[serde(flatten)]
    pub kind: RecommendationKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Recommendation {
    /// Structural validity check applied at the generator/ranker boundary.
    /// Invalid candidates are dropped, never surfaced to the caller.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
            && self.expires_at > self.created_at
            && [
                self.estimated_impact.sleep_quality,
                self.estimated_impact.energy_level,
                self.estimated_impact.consistency,
                self.estimated_impact.wellbeing,
                self.estimated_impact.productivity,
            ]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    EarlyMorning,
    Morning,
    Afternoon,
    Evening,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

/// Ephemeral per-request context. Computed fresh for each generation call
/// and never persisted beyond it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub time_of_day: TimeOfDay,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub season: Season,
    /// Ratio of cleanly dismissed alarms over the recent window.
    pub alarm_performance: f32,
    pub stress_estimate: f32,
    pub energy_estimate: f32,
    pub upcoming_events: Vec<String>,
    pub recent_engagement: f32,
}

/// Scalar feedback recorded after a user interacts with a recommendation.
/// Later writes for the same (user, recommendation) pair overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub user_id: String,
    pub recommendation_id: String,
    pub score: f32,
    pub recorded_at: DateTime<Utc>,
}

/// Which strategy produced a candidate. Used for stats and reasoning only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationSource {
    Collaborative,
    ContentBased,
    Contextual,
    Hybrid,
}

impl GenerationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationSource::Collaborative => "collaborative",
            GenerationSource::ContentBased => "content_based",
            GenerationSource::Contextual => "contextual",
            GenerationSource::Hybrid => "hybrid",
        }
    }
}

/// Per-source candidate counts for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub collaborative_count: usize,
    pub content_based_count: usize,
    pub contextual_count: usize,
    pub hybrid_count: usize,
    pub dropped_malformed: usize,
    pub total_candidates: usize,
    pub final_count: usize,
}

/// Human-readable explanation of how a result list was assembled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationReasoning {
    pub primary_factors: Vec<String>,
    pub collaborative_insights: Vec<String>,
    pub content_based_matches: Vec<String>,
    pub contextual_adjustments: Vec<String>,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub reasoning: RecommendationReasoning,
    pub next_update_in_minutes: u32,
}

/// Aggregated engagement metrics for observability dashboards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationMetrics {
    pub total_recommendations: usize,
    pub average_engagement: f32,
    /// Mean engagement per category, for served entries that received feedback.
    pub category_performance: HashMap<String, f32>,
    /// Mean engagement per recommendation kind.
    pub type_performance: HashMap<String, f32>,
}
