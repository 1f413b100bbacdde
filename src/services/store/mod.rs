// ============================================
// User Vector Store
// ============================================
//
// Owns the per-user `{features, embedding, last_updated}` state. The storage
// trait keeps the backend pluggable; the in-memory implementation is the
// reference backend and the one used in tests. Read-modify-write for a
// single user goes through the map entry API so concurrent updates for the
// same user serialize, while different users proceed in parallel.

use crate::config::FeatureConfig;
use crate::models::UserVector;
use crate::services::features::{build_embedding, FeatureUpdate};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage contract for user vectors. `get` lazily creates a
/// default-initialized vector for never-seen users.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<UserVector>;

    /// Merge a partial feature update into the stored vector, regenerate the
    /// embedding, and bump `last_updated`. Last write wins per feature.
    async fn update(&self, user_id: &str, update: FeatureUpdate) -> Result<UserVector>;

    /// Point-in-time copy of all known vectors. May be stale relative to
    /// concurrent updates; similarity scans tolerate that.
    async fn snapshot(&self) -> Result<Vec<UserVector>>;
}

/// DashMap-backed reference implementation.
pub struct InMemoryVectorStore {
    vectors: DashMap<String, UserVector>,
    config: FeatureConfig,
}

impl InMemoryVectorStore {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            vectors: DashMap::new(),
            config,
        }
    }

    fn default_vector(&self, user_id: &str) -> UserVector {
        let features: HashMap<String, f32> = HashMap::new();
        let embedding = build_embedding(&features, self.config.embedding_dim);
        UserVector {
            user_id: user_id.to_string(),
            features,
            embedding,
            observed_events: 0,
            last_updated: Utc::now(),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn get(&self, user_id: &str) -> Result<UserVector> {
        if let Some(vector) = self.vectors.get(user_id) {
            return Ok(vector.clone());
        }

        let vector = self.default_vector(user_id);
        let entry = self
            .vectors
            .entry(user_id.to_string())
            .or_insert_with(|| vector);
        Ok(entry.clone())
    }

    async fn update(&self, user_id: &str, update: FeatureUpdate) -> Result<UserVector> {
        let dim = self.config.embedding_dim;
        // The entry guard holds the shard lock for the whole read-modify-write,
        // so same-user updates cannot lose writes.
        let mut entry = self
            .vectors
            .entry(user_id.to_string())
            .or_insert_with(|| self.default_vector(user_id));

        for (name, value) in update.values {
            if value.is_finite() {
                entry.features.insert(name, value);
            }
        }
        entry.observed_events = entry.observed_events.max(update.observed_events);
        entry.embedding = build_embedding(&entry.features, dim);
        entry.last_updated = Utc::now();

        debug!(
            user_id = %user_id,
            feature_count = entry.features.len(),
            observed_events = entry.observed_events,
            "User vector updated"
        );

        Ok(entry.clone())
    }

    async fn snapshot(&self) -> Result<Vec<UserVector>> {
        Ok(self.vectors.iter().map(|e| e.value().clone()).collect())
    }
}
