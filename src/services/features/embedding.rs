/// Embedding Builder
///
/// Deterministic mapping from a feature map to the fixed-length vector used
/// for cosine similarity. Features are read in `FEATURE_ORDER`, absent ones
/// encode their documented default, and the result is right-padded with
/// zeros (or truncated) to the configured length. Two independently
/// computed embeddings for the same feature set are bit-for-bit identical.
use super::{default_feature_value, CHANGE_ADAPTABILITY, CONSISTENCY_SCORE, ENGAGEMENT_LEVEL,
    ENGAGEMENT_TREND, MORNING_PERSONALITY, SLEEP_QUALITY_TREND, STRESS_RESILIENCE,
    WORK_LIFE_BALANCE};
use std::collections::HashMap;

/// Fixed field order for vectorization. Appending here is safe; reordering
/// invalidates every stored embedding.
pub const FEATURE_ORDER: [&str; 8] = [
    CONSISTENCY_SCORE,
    MORNING_PERSONALITY,
    CHANGE_ADAPTABILITY,
    STRESS_RESILIENCE,
    ENGAGEMENT_LEVEL,
    WORK_LIFE_BALANCE,
    SLEEP_QUALITY_TREND,
    ENGAGEMENT_TREND,
];

/// Build the embedding for a feature map. Output length is always
/// exactly `dim`.
pub fn build_embedding(features: &HashMap<String, f32>, dim: usize) -> Vec<f32> {
    let mut embedding: Vec<f32> = FEATURE_ORDER
        .iter()
        .map(|name| {
            features
                .get(*name)
                .copied()
                .unwrap_or_else(|| default_feature_value(name))
        })
        .collect();

    embedding.resize(dim, 0.0);
    embedding.truncate(dim);
    embedding
}
