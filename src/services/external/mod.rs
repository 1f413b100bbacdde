// ============================================
// External Collaborator Interfaces
// ============================================
//
// Seams to everything this core does not implement itself:
// - CrossPlatformProvider: optional health/calendar/weather/social/location/
//   productivity snapshots. Every field is nullable; the hybrid generator
//   must work with any subset of them.
// - Predictor: pluggable sub-analysis interface. A deterministic heuristic
//   implementation ships here; a real statistical model satisfies the same
//   contract.
// - IdGenerator: injected recommendation-ID source so tests can assert on
//   deterministic IDs.

use crate::models::UserVector;
use crate::services::features::{CONSISTENCY_SCORE, SLEEP_QUALITY_TREND, STRESS_RESILIENCE,
    WORK_LIFE_BALANCE};
use crate::utils::clamp01;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Point-in-time snapshot of cross-platform signals. Any category, and any
/// field within a category, may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalSnapshot {
    pub health: Option<HealthData>,
    pub calendar: Option<CalendarData>,
    pub weather: Option<WeatherData>,
    pub social: Option<SocialData>,
    pub location: Option<LocationData>,
    pub productivity: Option<ProductivityData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthData {
    pub sleep_duration_hours: Option<f32>,
    pub sleep_quality: Option<f32>,
    pub stress_level: Option<f32>,
    pub energy_level: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarData {
    pub events_today: Option<u32>,
    pub first_event_hour: Option<u8>,
    pub busy_score: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherData {
    pub condition: Option<String>,
    pub temperature_c: Option<f32>,
    pub sunrise_hour: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialData {
    pub shared_challenges: Option<u32>,
    pub friend_activity: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationData {
    pub timezone_offset_minutes: Option<i32>,
    pub travel_detected: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductivityData {
    pub focus_score: Option<f32>,
    pub tasks_completed: Option<u32>,
}

/// Cross-platform data source. Implementations own their sync mechanics;
/// the core only ever awaits a fetch, under an explicit timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrossPlatformProvider: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<ExternalSnapshot>;
}

/// Provider that reports no signals at all. Useful default when the user has
/// connected no external platforms.
pub struct NoopProvider;

#[async_trait]
impl CrossPlatformProvider for NoopProvider {
    async fn fetch(&self, _user_id: &str) -> Result<ExternalSnapshot> {
        Ok(ExternalSnapshot::default())
    }
}

/// Pluggable sub-analysis contract. Both the heuristic stub and a real
/// statistical model implement this, which keeps property tests independent
/// of model internals.
pub trait Predictor: Send + Sync {
    /// Forecast of upcoming sleep quality, `[0, 1]`.
    fn sleep_quality_forecast(&self, vector: &UserVector) -> f32;

    /// Named behavioral risk factors worth surfacing as insight evidence.
    fn risk_factors(&self, vector: &UserVector) -> Vec<String>;
}

/// Deterministic feature-driven predictor.
pub struct HeuristicPredictor;

impl Predictor for HeuristicPredictor {
    fn sleep_quality_forecast(&self, vector: &UserVector) -> f32 {
        let consistency = vector.features.get(CONSISTENCY_SCORE).copied().unwrap_or(0.5);
        let trend = vector.features.get(SLEEP_QUALITY_TREND).copied().unwrap_or(0.0);
        clamp01(0.6 * consistency + 0.2 + 0.2 * trend)
    }

    fn risk_factors(&self, vector: &UserVector) -> Vec<String> {
        let mut factors = Vec::new();
        if vector.features.get(STRESS_RESILIENCE).copied().unwrap_or(0.5) < 0.3 {
            factors.push("frequent snoozing under stress".to_string());
        }
        if vector.features.get(WORK_LIFE_BALANCE).copied().unwrap_or(0.5) < 0.4 {
            factors.push("late-night alarm activity".to_string());
        }
        if vector.features.get(SLEEP_QUALITY_TREND).copied().unwrap_or(0.0) < -0.3 {
            factors.push("declining sleep-quality trend".to_string());
        }
        factors
    }
}

/// Injected recommendation-ID source.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Production ID source.
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic counter IDs, for deterministic test assertions.
#[derive(Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        format!("rec-{}", self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn vector(features: &[(&str, f32)]) -> UserVector {
        UserVector {
            user_id: "u1".to_string(),
            features: features
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
            embedding: Vec::new(),
            observed_events: 10,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_heuristic_predictor_is_deterministic() {
        let predictor = HeuristicPredictor;
        let v = vector(&[(CONSISTENCY_SCORE, 0.8), (SLEEP_QUALITY_TREND, 0.2)]);
        assert_eq!(
            predictor.sleep_quality_forecast(&v),
            predictor.sleep_quality_forecast(&v)
        );
        assert!((0.0..=1.0).contains(&predictor.sleep_quality_forecast(&v)));
    }

    #[test]
    fn test_risk_factors_fire_on_low_features() {
        let predictor = HeuristicPredictor;
        let risky = vector(&[
            (STRESS_RESILIENCE, 0.1),
            (WORK_LIFE_BALANCE, 0.2),
            (SLEEP_QUALITY_TREND, -0.5),
        ]);
        assert_eq!(predictor.risk_factors(&risky).len(), 3);

        let calm = vector(&[(STRESS_RESILIENCE, 0.8)]);
        assert!(predictor.risk_factors(&calm).is_empty());
    }

    #[test]
    fn test_sequential_ids_are_unique_and_ordered() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.next_id(), "rec-0");
        assert_eq!(ids.next_id(), "rec-1");
    }

    #[tokio::test]
    async fn test_noop_provider_reports_nothing() {
        let snapshot = NoopProvider.fetch("u1").await.unwrap();
        assert!(snapshot.health.is_none());
        assert!(snapshot.calendar.is_none());
    }
}
