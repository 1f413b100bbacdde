// ============================================
// Behavioral Feature Extractor
// ============================================
//
// Pure functions that turn raw alarm and alarm-event history into a partial
// feature update. Only features with enough supporting data are emitted; an
// absent field leaves the previously stored value untouched, so extraction
// never overwrites a feature with a lower-confidence estimate.

pub mod embedding;

use crate::config::FeatureConfig;
use crate::models::{Alarm, AlarmEvent};
use crate::utils::clamp01;
use chrono::Timelike;
use std::collections::HashMap;
use tracing::debug;

pub use embedding::{build_embedding, FEATURE_ORDER};

/// How regularly the user dismisses alarms without snoozing.
pub const CONSISTENCY_SCORE: &str = "consistency_score";
/// Fraction of alarms scheduled in the morning window.
pub const MORNING_PERSONALITY: &str = "morning_personality";
/// Normalized variance of fired clock-times; spread schedules score higher.
pub const CHANGE_ADAPTABILITY: &str = "change_adaptability";
/// 1 - 2 * snooze rate, floored at zero.
pub const STRESS_RESILIENCE: &str = "stress_resilience";
/// Event volume relative to a full observation window.
pub const ENGAGEMENT_LEVEL: &str = "engagement_level";
/// Penalizes late-night alarm activity.
pub const WORK_LIFE_BALANCE: &str = "work_life_balance";
/// Signed: recent snooze-rate improvement vs the prior week.
pub const SLEEP_QUALITY_TREND: &str = "sleep_quality_trend";
/// Signed: recent clean-dismissal improvement vs the prior week.
pub const ENGAGEMENT_TREND: &str = "engagement_trend";

/// Default value a scored feature holds before any data arrives.
pub const SCORED_FEATURE_DEFAULT: f32 = 0.5;
/// Default value for signed trend features.
pub const TREND_FEATURE_DEFAULT: f32 = 0.0;

/// Partial feature update produced by one extraction pass.
#[derive(Debug, Clone, Default)]
pub struct FeatureUpdate {
    pub values: HashMap<String, f32>,
    /// Events observed in this pass; accumulated by the vector store.
    pub observed_events: u32,
}

/// Whether a feature is a signed trend delta (default 0.0) rather than a
/// `[0, 1]` score (default 0.5).
pub fn is_trend_feature(name: &str) -> bool {
    matches!(name, SLEEP_QUALITY_TREND | ENGAGEMENT_TREND)
}

pub fn default_feature_value(name: &str) -> f32 {
    if is_trend_feature(name) {
        TREND_FEATURE_DEFAULT
    } else {
        SCORED_FEATURE_DEFAULT
    }
}

/// Extract a partial feature update from alarm and event history.
///
/// `events` are expected ordered oldest-first; only the most recent
/// `config.recent_window` events feed windowed rates.
pub fn extract_features(
    alarms: &[Alarm],
    events: &[AlarmEvent],
    config: &FeatureConfig,
) -> FeatureUpdate {
    let mut update = FeatureUpdate {
        values: HashMap::new(),
        observed_events: events.len() as u32,
    };

    let recent: Vec<&AlarmEvent> = events
        .iter()
        .rev()
        .take(config.recent_window)
        .collect();

    if recent.len() >= config.min_events_for_rate {
        let total = recent.len() as f32;

        let clean = recent.iter().filter(|e| e.dismissed && !e.snoozed).count() as f32;
        update
            .values
            .insert(CONSISTENCY_SCORE.to_string(), clamp01(clean / total));

        let snooze_rate = recent.iter().filter(|e| e.snoozed).count() as f32 / total;
        update.values.insert(
            STRESS_RESILIENCE.to_string(),
            clamp01(1.0 - 2.0 * snooze_rate),
        );

        update.values.insert(
            ENGAGEMENT_LEVEL.to_string(),
            clamp01(recent.len() as f32 / config.recent_window as f32),
        );

        let late_night = recent
            .iter()
            .filter(|e| {
                let hour = e.fired_at.hour();
                hour >= 22 || hour < 4
            })
            .count() as f32;
        update.values.insert(
            WORK_LIFE_BALANCE.to_string(),
            clamp01(1.0 - 2.0 * late_night / total),
        );
    }

    if !alarms.is_empty() {
        let morning = alarms
            .iter()
            .filter(|a| {
                a.hour()
                    .map(|h| h >= config.morning_start_hour && h < config.morning_end_hour)
                    .unwrap_or(false)
            })
            .count() as f32;
        update.values.insert(
            MORNING_PERSONALITY.to_string(),
            clamp01(morning / alarms.len() as f32),
        );
    }

    if recent.len() >= config.min_events_for_variance {
        update.values.insert(
            CHANGE_ADAPTABILITY.to_string(),
            adaptability_from_fired_times(&recent),
        );
    }

    if events.len() >= config.min_events_for_trend {
        let (sleep_trend, engagement_trend) = trend_deltas(events);
        update
            .values
            .insert(SLEEP_QUALITY_TREND.to_string(), sleep_trend);
        update
            .values
            .insert(ENGAGEMENT_TREND.to_string(), engagement_trend);
    }

    debug!(
        event_count = events.len(),
        emitted = update.values.len(),
        "Feature extraction completed"
    );

    update
}

/// Normalized std-dev of fired minute-of-day, capped at 1.0. A three-hour
/// spread saturates the score.
fn adaptability_from_fired_times(recent: &[&AlarmEvent]) -> f32 {
    let minutes: Vec<f32> = recent
        .iter()
        .map(|e| (e.fired_at.hour() * 60 + e.fired_at.minute()) as f32)
        .collect();

    let mean = minutes.iter().sum::<f32>() / minutes.len() as f32;
    let variance =
        minutes.iter().map(|m| (m - mean).powi(2)).sum::<f32>() / minutes.len() as f32;
    let std_dev = variance.sqrt();

    clamp01(std_dev / 180.0)
}

/// Signed trend deltas: the last 7 events against the 7 before them.
/// Positive means improvement.
fn trend_deltas(events: &[AlarmEvent]) -> (f32, f32) {
    let newest_first: Vec<&AlarmEvent> = events.iter().rev().collect();
    let recent = &newest_first[0..7];
    let earlier = &newest_first[7..14];

    let snooze_rate =
        |window: &[&AlarmEvent]| window.iter().filter(|e| e.snoozed).count() as f32 / 7.0;
    let clean_rate = |window: &[&AlarmEvent]| {
        window.iter().filter(|e| e.dismissed && !e.snoozed).count() as f32 / 7.0
    };

    // Less snoozing lately reads as a sleep-quality improvement.
    let sleep_trend = (snooze_rate(earlier) - snooze_rate(recent)).clamp(-1.0, 1.0);
    let engagement_trend = (clean_rate(recent) - clean_rate(earlier)).clamp(-1.0, 1.0);

    (sleep_trend, engagement_trend)
}
