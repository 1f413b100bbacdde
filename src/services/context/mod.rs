// ============================================
// Request Context Builder
// ============================================
//
// Computes the ephemeral RecommendationContext for one request: time-of-day
// bucket, day-of-week, season, recent alarm-performance ratio, stress and
// energy estimates, recent engagement average. The context lives only for
// the request that produced it.

use crate::models::{AlarmEvent, RecommendationContext, Season, TimeOfDay};
use crate::utils::clamp01;
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Events considered for the recent performance ratio.
const PERFORMANCE_WINDOW: usize = 10;

pub fn time_of_day_bucket(hour: u32) -> TimeOfDay {
    match hour {
        4..=6 => TimeOfDay::EarlyMorning,
        7..=11 => TimeOfDay::Morning,
        12..=17 => TimeOfDay::Afternoon,
        18..=21 => TimeOfDay::Evening,
        _ => TimeOfDay::Night,
    }
}

/// Meteorological seasons, northern hemisphere.
pub fn season_of(month: u32) -> Season {
    match month {
        12 | 1 | 2 => Season::Winter,
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        _ => Season::Autumn,
    }
}

/// Build the context from request time, event history, and the caller's
/// engagement average. Upcoming events stay empty here; the hybrid
/// generator folds calendar data in from the external snapshot instead.
pub fn build_context(
    now: DateTime<Utc>,
    events: &[AlarmEvent],
    recent_engagement: f32,
) -> RecommendationContext {
    let recent: Vec<&AlarmEvent> = events.iter().rev().take(PERFORMANCE_WINDOW).collect();

    let alarm_performance = if recent.is_empty() {
        0.5
    } else {
        recent.iter().filter(|e| e.dismissed && !e.snoozed).count() as f32 / recent.len() as f32
    };

    let snooze_rate = if recent.is_empty() {
        0.0
    } else {
        recent.iter().filter(|e| e.snoozed).count() as f32 / recent.len() as f32
    };

    RecommendationContext {
        time_of_day: time_of_day_bucket(now.hour()),
        day_of_week: now.weekday().num_days_from_sunday() as u8,
        season: season_of(now.month()),
        alarm_performance: clamp01(alarm_performance),
        // Heavy snoozing reads as elevated stress; clean dismissals as energy
        stress_estimate: clamp01(0.3 + snooze_rate),
        energy_estimate: clamp01(0.3 + 0.7 * alarm_performance),
        upcoming_events: Vec::new(),
        recent_engagement: clamp01(recent_engagement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(hour: u32, dismissed: bool, snoozed: bool) -> AlarmEvent {
        AlarmEvent {
            id: "e".to_string(),
            alarm_id: "a".to_string(),
            fired_at: Utc.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap(),
            dismissed,
            snoozed,
        }
    }

    #[test]
    fn test_time_of_day_buckets() {
        assert_eq!(time_of_day_bucket(5), TimeOfDay::EarlyMorning);
        assert_eq!(time_of_day_bucket(9), TimeOfDay::Morning);
        assert_eq!(time_of_day_bucket(14), TimeOfDay::Afternoon);
        assert_eq!(time_of_day_bucket(20), TimeOfDay::Evening);
        assert_eq!(time_of_day_bucket(2), TimeOfDay::Night);
        assert_eq!(time_of_day_bucket(23), TimeOfDay::Night);
    }

    #[test]
    fn test_seasons() {
        assert_eq!(season_of(1), Season::Winter);
        assert_eq!(season_of(4), Season::Spring);
        assert_eq!(season_of(7), Season::Summer);
        assert_eq!(season_of(10), Season::Autumn);
        assert_eq!(season_of(12), Season::Winter);
    }

    #[test]
    fn test_context_defaults_without_events() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 7, 30, 0).unwrap();
        let ctx = build_context(now, &[], 0.5);
        assert_eq!(ctx.alarm_performance, 0.5);
        assert_eq!(ctx.time_of_day, TimeOfDay::Morning);
        assert_eq!(ctx.season, Season::Winter);
    }

    #[test]
    fn test_snoozing_raises_stress_estimate() {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 7, 0, 0).unwrap();
        let snoozy: Vec<AlarmEvent> = (0..8).map(|_| event(7, false, true)).collect();
        let clean: Vec<AlarmEvent> = (0..8).map(|_| event(7, true, false)).collect();

        let stressed = build_context(now, &snoozy, 0.5);
        let relaxed = build_context(now, &clean, 0.5);

        assert!(stressed.stress_estimate > relaxed.stress_estimate);
        assert!(relaxed.energy_estimate > stressed.energy_estimate);
        assert_eq!(relaxed.alarm_performance, 1.0);
    }
}
