//! Service layer orchestrating retrieval, prompt assembly, and model dispatch.

mod analysis_service;
mod review_collection;

pub use analysis_service::{AnalysisConfig, ModelBackend, ReviewAnalyzer};
pub use review_collection::{EmbeddingEngine, ReviewCollection, VectorStore};
