//! Domain layer: core entities and value objects for review-lens.

pub mod errors;
pub mod models;

pub use errors::DomainError;
pub use models::{
    CollectionInfo, RatingComparison, RatingFilter, ReviewEmbedding, ReviewMatch, ReviewQuery,
    ReviewRecord, ReviewSummary,
};
