// ============================================
// Behavioral Profiler
// ============================================
//
// Maps accumulated behavioral features into a psychological profile:
// trait scores, chronotype, stress-response and adaptability classes.
// The profile feeds message personalization only, never ranking.
// Classification thresholds live in ProfilerConfig.

use crate::config::ProfilerConfig;
use crate::models::{
    AdaptabilityLevel, Chronotype, MotivationalFactors, PsychologicalProfile, StressResponse,
    TraitScores, UserVector,
};
use crate::services::features::{
    CHANGE_ADAPTABILITY, CONSISTENCY_SCORE, ENGAGEMENT_LEVEL, ENGAGEMENT_TREND,
    MORNING_PERSONALITY, SCORED_FEATURE_DEFAULT, STRESS_RESILIENCE, WORK_LIFE_BALANCE,
};
use crate::utils::clamp01;

pub struct BehavioralProfiler {
    config: ProfilerConfig,
}

impl BehavioralProfiler {
    pub fn new(config: ProfilerConfig) -> Self {
        Self { config }
    }

    /// Derive the profile for a user vector. Missing features fall back to
    /// their neutral defaults, so a brand-new user gets a neutral profile
    /// with low confidence.
    pub fn build(&self, vector: &UserVector) -> PsychologicalProfile {
        let feature = |name: &str| {
            vector
                .features
                .get(name)
                .copied()
                .unwrap_or(SCORED_FEATURE_DEFAULT)
        };

        let consistency = feature(CONSISTENCY_SCORE);
        let morning = feature(MORNING_PERSONALITY);
        let adaptability = feature(CHANGE_ADAPTABILITY);
        let resilience = feature(STRESS_RESILIENCE);
        let engagement = feature(ENGAGEMENT_LEVEL);
        let balance = feature(WORK_LIFE_BALANCE);
        let engagement_trend = vector
            .features
            .get(ENGAGEMENT_TREND)
            .copied()
            .unwrap_or(0.0);

        let traits = TraitScores {
            // Willingness to vary routine reads as openness
            openness: clamp01(0.3 + 0.7 * adaptability),
            conscientiousness: clamp01(consistency),
            extraversion: clamp01(0.2 + 0.6 * engagement),
            agreeableness: clamp01(0.35 + 0.3 * balance),
            neuroticism: clamp01(1.0 - resilience),
        };

        let motivation = MotivationalFactors {
            achievement: clamp01(consistency),
            autonomy: clamp01(adaptability),
            mastery: clamp01(0.5 + 0.5 * engagement_trend),
            purpose: clamp01(balance),
            social: clamp01(engagement),
        };

        PsychologicalProfile {
            user_id: vector.user_id.clone(),
            traits,
            motivation,
            chronotype: self.classify_chronotype(morning),
            stress_response: self.classify_stress_response(resilience),
            change_adaptability: self.classify_adaptability(adaptability),
            confidence: self.confidence(vector.observed_events),
        }
    }

    fn classify_chronotype(&self, morning_personality: f32) -> Chronotype {
        let c = &self.config;
        if morning_personality >= c.extreme_morning_threshold {
            Chronotype::ExtremeMorning
        } else if morning_personality >= c.morning_threshold {
            Chronotype::Morning
        } else if morning_personality >= c.evening_threshold {
            Chronotype::Neither
        } else if morning_personality >= c.extreme_evening_threshold {
            Chronotype::Evening
        } else {
            Chronotype::ExtremeEvening
        }
    }

    fn classify_stress_response(&self, resilience: f32) -> StressResponse {
        if resilience >= self.config.high_resilience_threshold {
            StressResponse::HighResilience
        } else if resilience >= self.config.moderate_resilience_threshold {
            StressResponse::ModerateResilience
        } else {
            StressResponse::LowResilience
        }
    }

    fn classify_adaptability(&self, adaptability: f32) -> AdaptabilityLevel {
        if adaptability >= self.config.high_adaptability_threshold {
            AdaptabilityLevel::High
        } else if adaptability >= self.config.moderate_adaptability_threshold {
            AdaptabilityLevel::Moderate
        } else {
            AdaptabilityLevel::Low
        }
    }

    /// Rises monotonically with observed events; never decreases from data
    /// loss alone because the store accumulates the event counter.
    fn confidence(&self, observed_events: u32) -> f32 {
        (observed_events as f32 / self.config.confidence_event_divisor)
            .min(self.config.confidence_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn vector_with(features: &[(&str, f32)], observed_events: u32) -> UserVector {
        UserVector {
            user_id: "u1".to_string(),
            features: features
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
            embedding: Vec::new(),
            observed_events,
            last_updated: Utc::now(),
        }
    }

    fn profiler() -> BehavioralProfiler {
        BehavioralProfiler::new(ProfilerConfig::default())
    }

    #[test]
    fn test_chronotype_bands() {
        let p = profiler();
        let chronotype = |m: f32| p.build(&vector_with(&[(MORNING_PERSONALITY, m)], 30)).chronotype;
        assert_eq!(chronotype(0.85), Chronotype::ExtremeMorning);
        assert_eq!(chronotype(0.7), Chronotype::Morning);
        assert_eq!(chronotype(0.5), Chronotype::Neither);
        assert_eq!(chronotype(0.3), Chronotype::Evening);
        assert_eq!(chronotype(0.1), Chronotype::ExtremeEvening);
    }

    #[test]
    fn test_stress_response_classes() {
        let p = profiler();
        let class = |r: f32| {
            p.build(&vector_with(&[(STRESS_RESILIENCE, r)], 30))
                .stress_response
        };
        assert_eq!(class(0.9), StressResponse::HighResilience);
        assert_eq!(class(0.5), StressResponse::ModerateResilience);
        assert_eq!(class(0.2), StressResponse::LowResilience);
    }

    #[test]
    fn test_conscientiousness_tracks_consistency() {
        let p = profiler();
        let high = p.build(&vector_with(&[(CONSISTENCY_SCORE, 0.95)], 30));
        let low = p.build(&vector_with(&[(CONSISTENCY_SCORE, 0.1)], 30));
        assert!(high.traits.conscientiousness > low.traits.conscientiousness);
    }

    #[test]
    fn test_confidence_monotonic_and_capped() {
        let p = profiler();
        let conf = |events: u32| p.build(&vector_with(&[], events)).confidence;
        assert_eq!(conf(0), 0.0);
        assert!((conf(15) - 0.5).abs() < 1e-6);
        assert!(conf(15) < conf(27));
        // Capped at 0.9 no matter how much data accumulates
        assert!((conf(300) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_new_user_gets_neutral_profile() {
        let profile = profiler().build(&vector_with(&[], 0));
        assert_eq!(profile.chronotype, Chronotype::Neither);
        assert_eq!(profile.stress_response, StressResponse::ModerateResilience);
        assert_eq!(profile.change_adaptability, AdaptabilityLevel::Moderate);
        assert!((0.0..=1.0).contains(&profile.traits.openness));
    }
}
