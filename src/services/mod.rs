// ============================================
// Service Layer
// ============================================

pub mod context;
pub mod engine;
pub mod external;
pub mod features;
pub mod generators;
pub mod history;
pub mod profiler;
pub mod ranking;
pub mod similarity;
pub mod store;

pub use engine::RecommendationEngine;
pub use generators::{CandidateGenerator, GeneratorLayer};
pub use history::{EngagementStore, HistoryStore};
pub use ranking::RankingLayer;
pub use similarity::SimilarityIndex;
pub use store::{StoreError, VectorStore};
