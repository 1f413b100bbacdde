// ============================================
// Recommendation History & Engagement Tracker
// ============================================
//
// Two append-side stores closing the feedback loop:
// - HistoryStore: per-user FIFO log of served recommendations, capped,
//   used for dedup-against-history and preference mining.
// - EngagementStore: upsert of a scalar engagement score per served
//   recommendation, read back by the content-based generator and the
//   selector on the next invocation.
//
// Both are trait-based so the in-memory DashMap backends can be swapped for
// a durable store without touching callers.

use crate::models::{EngagementRecord, Recommendation, RecommendationMetrics};
use crate::services::store::{Result, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append served recommendations, evicting oldest entries beyond the cap.
    async fn append(&self, user_id: &str, recommendations: &[Recommendation]) -> Result<()>;

    /// Full retained history, oldest first.
    async fn get(&self, user_id: &str) -> Result<Vec<Recommendation>>;
}

#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Record (or overwrite) the engagement score for one recommendation.
    /// Scores outside [0, 1] are rejected.
    async fn record(&self, user_id: &str, recommendation_id: &str, score: f32) -> Result<()>;

    /// Mean over all recorded scores for the user; 0.5 when none exist so
    /// the selector always has a safe starting bound.
    async fn average(&self, user_id: &str) -> Result<f32>;

    /// All engagement records for a user, unordered.
    async fn records(&self, user_id: &str) -> Result<Vec<EngagementRecord>>;
}

pub struct InMemoryHistoryStore {
    histories: DashMap<String, VecDeque<Recommendation>>,
    cap: usize,
}

impl InMemoryHistoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            histories: DashMap::new(),
            cap,
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, user_id: &str, recommendations: &[Recommendation]) -> Result<()> {
        let mut entry = self
            .histories
            .entry(user_id.to_string())
            .or_insert_with(VecDeque::new);

        for rec in recommendations {
            entry.push_back(rec.clone());
        }
        // FIFO eviction: recency matters for dedup and trend mining
        while entry.len() > self.cap {
            entry.pop_front();
        }

        debug!(
            user_id = %user_id,
            appended = recommendations.len(),
            retained = entry.len(),
            "History appended"
        );
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Vec<Recommendation>> {
        Ok(self
            .histories
            .get(user_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryEngagementStore {
    records: DashMap<String, HashMap<String, EngagementRecord>>,
}

impl InMemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngagementStore for InMemoryEngagementStore {
    async fn record(&self, user_id: &str, recommendation_id: &str, score: f32) -> Result<()> {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(StoreError::InvalidData(format!(
                "engagement score out of range: {}",
                score
            )));
        }

        let record = EngagementRecord {
            user_id: user_id.to_string(),
            recommendation_id: recommendation_id.to_string(),
            score,
            recorded_at: Utc::now(),
        };

        self.records
            .entry(user_id.to_string())
            .or_default()
            .insert(recommendation_id.to_string(), record);

        debug!(user_id = %user_id, recommendation_id = %recommendation_id, score, "Engagement recorded");
        Ok(())
    }

    async fn average(&self, user_id: &str) -> Result<f32> {
        Ok(self
            .records
            .get(user_id)
            .filter(|r| !r.is_empty())
            .map(|r| r.values().map(|rec| rec.score).sum::<f32>() / r.len() as f32)
            .unwrap_or(0.5))
    }

    async fn records(&self, user_id: &str) -> Result<Vec<EngagementRecord>> {
        Ok(self
            .records
            .get(user_id)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Aggregate served-recommendation metrics for one user: total served,
/// rolling engagement average, and mean engagement per category and per
/// recommendation kind (for entries that received feedback).
pub async fn compute_metrics(
    user_id: &str,
    history: &dyn HistoryStore,
    engagement: &dyn EngagementStore,
) -> Result<RecommendationMetrics> {
    let served = history.get(user_id).await?;
    let records = engagement.records(user_id).await?;
    let scores: HashMap<&str, f32> = records
        .iter()
        .map(|r| (r.recommendation_id.as_str(), r.score))
        .collect();

    let mut category_sums: HashMap<String, (f32, usize)> = HashMap::new();
    let mut type_sums: HashMap<String, (f32, usize)> = HashMap::new();

    for rec in &served {
        if let Some(score) = scores.get(rec.id.as_str()) {
            let cat = category_sums
                .entry(rec.category.as_str().to_string())
                .or_insert((0.0, 0));
            cat.0 += score;
            cat.1 += 1;

            let kind = type_sums
                .entry(rec.kind.as_str().to_string())
                .or_insert((0.0, 0));
            kind.0 += score;
            kind.1 += 1;
        }
    }

    let mean = |sums: HashMap<String, (f32, usize)>| {
        sums.into_iter()
            .map(|(k, (sum, n))| (k, sum / n as f32))
            .collect::<HashMap<String, f32>>()
    };

    Ok(RecommendationMetrics {
        total_recommendations: served.len(),
        average_engagement: engagement.average(user_id).await?,
        category_performance: mean(category_sums),
        type_performance: mean(type_sums),
    })
}
