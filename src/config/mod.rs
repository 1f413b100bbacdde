use serde::Deserialize;
use std::env;
use std::fmt::Debug;
use std::str::FromStr;

/// Pipeline configuration.
///
/// Every threshold the pipeline applies (chronotype bands, ranking weights,
/// selector bounds, caps, timeouts) lives here rather than as a hard
/// constant, with the observed defaults baked into `Default`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub features: FeatureConfig,
    pub profiler: ProfilerConfig,
    pub generation: GenerationConfig,
    pub ranking: RankingConfig,
    pub history: HistoryConfig,
    pub cadence: CadenceConfig,
}

/// Feature extraction windows and minimum sample sizes.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    /// Events considered for windowed rates (most recent first).
    pub recent_window: usize,
    /// Minimum events before a rate-based feature is emitted.
    pub min_events_for_rate: usize,
    /// Minimum fired events before the variance-based adaptability feature.
    pub min_events_for_variance: usize,
    /// Minimum events before signed trend features (recent 7 vs prior 7).
    pub min_events_for_trend: usize,
    /// Inclusive start of the "morning" scheduling window.
    pub morning_start_hour: u8,
    /// Exclusive end of the "morning" scheduling window.
    pub morning_end_hour: u8,
    /// Fixed embedding length; constant across all users.
    pub embedding_dim: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            recent_window: 30,
            min_events_for_rate: 5,
            min_events_for_variance: 3,
            min_events_for_trend: 14,
            morning_start_hour: 5,
            morning_end_hour: 9,
            embedding_dim: 50,
        }
    }
}

/// Threshold bands for trait and classification mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfilerConfig {
    pub extreme_morning_threshold: f32,
    pub morning_threshold: f32,
    pub evening_threshold: f32,
    pub extreme_evening_threshold: f32,
    pub high_resilience_threshold: f32,
    pub moderate_resilience_threshold: f32,
    pub high_adaptability_threshold: f32,
    pub moderate_adaptability_threshold: f32,
    /// Confidence ceiling; confidence = min(cap, events / divisor).
    pub confidence_cap: f32,
    pub confidence_event_divisor: f32,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            extreme_morning_threshold: 0.8,
            morning_threshold: 0.6,
            evening_threshold: 0.4,
            extreme_evening_threshold: 0.2,
            high_resilience_threshold: 0.7,
            moderate_resilience_threshold: 0.4,
            high_adaptability_threshold: 0.7,
            moderate_adaptability_threshold: 0.4,
            confidence_cap: 0.9,
            confidence_event_divisor: 30.0,
        }
    }
}

/// Candidate generation knobs shared by the four strategies.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Neighbors considered by the collaborative strategy.
    pub similar_user_count: usize,
    /// Neighbor engagement floor for a history entry to be borrowed.
    pub min_neighbor_engagement: f32,
    /// Similarity-scaled candidates at or below this confidence are dropped.
    pub min_adapted_confidence: f32,
    /// Output cap for the collaborative strategy.
    pub collaborative_cap: usize,
    /// Feature values at or above this leave no room for improvement, so the
    /// content-based strategy stays quiet for the matching category.
    pub improvement_headroom: f32,
    /// Validity window stamped on emitted recommendations, in days.
    pub validity_days: i64,
    /// Budget for a single generator before it is dropped from the merge.
    pub generator_timeout_ms: u64,
    /// Budget for the cross-platform provider fetch inside the hybrid strategy.
    pub external_timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            similar_user_count: 10,
            min_neighbor_engagement: 0.7,
            min_adapted_confidence: 0.5,
            collaborative_cap: 5,
            improvement_headroom: 0.7,
            validity_days: 7,
            generator_timeout_ms: 2_000,
            external_timeout_ms: 1_500,
        }
    }
}

/// Scoring weights and selector bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    pub confidence_weight: f32,
    pub priority_weight: f32,
    pub impact_weight: f32,
    /// Average engagement above this unlocks the larger result bound.
    pub high_engagement_threshold: f32,
    pub engaged_limit: usize,
    pub default_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            confidence_weight: 0.4,
            priority_weight: 0.3,
            impact_weight: 0.3,
            high_engagement_threshold: 0.7,
            engaged_limit: 8,
            default_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Served recommendations retained per user; oldest evicted first.
    pub cap: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { cap: 50 }
    }
}

/// Next-update interval tiers, keyed on average engagement.
#[derive(Debug, Clone, Deserialize)]
pub struct CadenceConfig {
    pub engaged_minutes: u32,
    pub steady_minutes: u32,
    pub idle_minutes: u32,
    /// Engagement floor for the middle tier.
    pub steady_threshold: f32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            engaged_minutes: 360,
            steady_minutes: 720,
            idle_minutes: 1_440,
            steady_threshold: 0.4,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            profiler: ProfilerConfig::default(),
            generation: GenerationConfig::default(),
            ranking: RankingConfig::default(),
            history: HistoryConfig::default(),
            cadence: CadenceConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        Ok(Config {
            features: FeatureConfig {
                recent_window: env_parse("FEATURE_RECENT_WINDOW", 30),
                min_events_for_rate: env_parse("FEATURE_MIN_EVENTS_FOR_RATE", 5),
                min_events_for_variance: env_parse("FEATURE_MIN_EVENTS_FOR_VARIANCE", 3),
                min_events_for_trend: env_parse("FEATURE_MIN_EVENTS_FOR_TREND", 14),
                morning_start_hour: env_parse("FEATURE_MORNING_START_HOUR", 5),
                morning_end_hour: env_parse("FEATURE_MORNING_END_HOUR", 9),
                embedding_dim: env_parse("EMBEDDING_DIM", 50),
            },
            profiler: ProfilerConfig {
                extreme_morning_threshold: env_parse("PROFILE_EXTREME_MORNING_THRESHOLD", 0.8),
                morning_threshold: env_parse("PROFILE_MORNING_THRESHOLD", 0.6),
                evening_threshold: env_parse("PROFILE_EVENING_THRESHOLD", 0.4),
                extreme_evening_threshold: env_parse("PROFILE_EXTREME_EVENING_THRESHOLD", 0.2),
                high_resilience_threshold: env_parse("PROFILE_HIGH_RESILIENCE_THRESHOLD", 0.7),
                moderate_resilience_threshold: env_parse("PROFILE_MODERATE_RESILIENCE_THRESHOLD", 0.4),
                high_adaptability_threshold: env_parse("PROFILE_HIGH_ADAPTABILITY_THRESHOLD", 0.7),
                moderate_adaptability_threshold: env_parse("PROFILE_MODERATE_ADAPTABILITY_THRESHOLD", 0.4),
                confidence_cap: env_parse("PROFILE_CONFIDENCE_CAP", 0.9),
                confidence_event_divisor: env_parse("PROFILE_CONFIDENCE_EVENT_DIVISOR", 30.0),
            },
            generation: GenerationConfig {
                similar_user_count: env_parse("SIMILAR_USER_COUNT", 10),
                min_neighbor_engagement: env_parse("MIN_NEIGHBOR_ENGAGEMENT", 0.7),
                min_adapted_confidence: env_parse("MIN_ADAPTED_CONFIDENCE", 0.5),
                collaborative_cap: env_parse("COLLABORATIVE_CAP", 5),
                improvement_headroom: env_parse("IMPROVEMENT_HEADROOM", 0.7),
                validity_days: env_parse("RECOMMENDATION_VALIDITY_DAYS", 7),
                generator_timeout_ms: env_parse("GENERATOR_TIMEOUT_MS", 2_000),
                external_timeout_ms: env_parse("EXTERNAL_TIMEOUT_MS", 1_500),
            },
            ranking: RankingConfig {
                confidence_weight: env_parse("RANK_CONFIDENCE_WEIGHT", 0.4),
                priority_weight: env_parse("RANK_PRIORITY_WEIGHT", 0.3),
                impact_weight: env_parse("RANK_IMPACT_WEIGHT", 0.3),
                high_engagement_threshold: env_parse("RANK_HIGH_ENGAGEMENT_THRESHOLD", 0.7),
                engaged_limit: env_parse("RANK_ENGAGED_LIMIT", 8),
                default_limit: env_parse("RANK_DEFAULT_LIMIT", 5),
            },
            history: HistoryConfig {
                cap: env_parse("HISTORY_CAP", 50),
            },
            cadence: CadenceConfig {
                engaged_minutes: env_parse("CADENCE_ENGAGED_MINUTES", 360),
                steady_minutes: env_parse("CADENCE_STEADY_MINUTES", 720),
                idle_minutes: env_parse("CADENCE_IDLE_MINUTES", 1_440),
                steady_threshold: env_parse("CADENCE_STEADY_THRESHOLD", 0.4),
            },
        })
    }
}

/// Read an env var, fall back to the default when unset.
fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Debug,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{} must be a valid value: {:?}", key, e)),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.features.embedding_dim, 50);
        assert_eq!(config.features.min_events_for_rate, 5);
        assert_eq!(config.generation.similar_user_count, 10);
        assert_eq!(config.generation.collaborative_cap, 5);
        assert!((config.ranking.confidence_weight - 0.4).abs() < f32::EPSILON);
        assert!((config.ranking.priority_weight - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.ranking.engaged_limit, 8);
        assert_eq!(config.ranking.default_limit, 5);
        assert_eq!(config.history.cap, 50);
    }

    #[test]
    fn test_env_parse_default_when_unset() {
        assert_eq!(env_parse("DEFINITELY_NOT_SET_ANYWHERE_123", 42usize), 42);
    }
}
