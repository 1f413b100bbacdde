// ============================================
// Deduplicator / Ranker / Selector
// ============================================
//
// Merges the candidate sets from all generators, collapses near-duplicate
// titles keeping the highest-confidence instance, scores and sorts the
// remainder, then bounds the final list by the user's engagement tier.
// Pure over its inputs: re-running on the same candidate list produces the
// same ordering.

use crate::config::RankingConfig;
use crate::models::{Priority, Recommendation};
use crate::utils::normalize_title;
use std::collections::HashMap;
use tracing::debug;

pub fn priority_weight(priority: Priority) -> f32 {
    match priority {
        Priority::Critical => 1.0,
        Priority::High => 0.8,
        Priority::Medium => 0.6,
        Priority::Low => 0.4,
    }
}

pub struct RankingLayer {
    config: RankingConfig,
}

impl RankingLayer {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// score = w_c * confidence + w_p * priority + w_i * (Σ impact / 5)
    pub fn score(&self, rec: &Recommendation) -> f32 {
        self.config.confidence_weight * rec.confidence
            + self.config.priority_weight * priority_weight(rec.priority)
            + self.config.impact_weight * (rec.estimated_impact.sum() / 5.0)
    }

    /// Deduplicate by normalized title (higher confidence wins), then sort
    /// descending by score with newer `created_at` breaking ties.
    pub fn merge_and_rank(&self, candidates: Vec<Recommendation>) -> Vec<Recommendation> {
        let before = candidates.len();

        let mut by_title: HashMap<String, Recommendation> = HashMap::new();
        for candidate in candidates {
            let key = normalize_title(&candidate.title);
            match by_title.get(&key) {
                Some(existing) if existing.confidence >= candidate.confidence => {}
                _ => {
                    by_title.insert(key, candidate);
                }
            }
        }

        let mut ranked: Vec<Recommendation> = by_title.into_values().collect();
        ranked.sort_by(|a, b| {
            self.score(b)
                .partial_cmp(&self.score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
                // Final tiebreak keeps the order total and deterministic
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(
            candidates = before,
            survivors = ranked.len(),
            "Merge and rank completed"
        );

        ranked
    }

    /// Bound the final list by the user's engagement tier: engaged users get
    /// more options, low-engagement users are not overwhelmed.
    pub fn select(
        &self,
        ranked: Vec<Recommendation>,
        average_engagement: f32,
    ) -> Vec<Recommendation> {
        let limit = if average_engagement > self.config.high_engagement_threshold {
            self.config.engaged_limit
        } else {
            self.config.default_limit
        };

        ranked.into_iter().take(limit).collect()
    }
}
