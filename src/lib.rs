pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::{Recommendation, RecommendationContext, RecommendationResponse};
pub use services::{RecommendationEngine, RankingLayer, SimilarityIndex, VectorStore};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the default tracing subscriber, filtered by `RUST_LOG`. For
/// embedding hosts that do not bring their own; calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
