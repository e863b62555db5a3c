use serde::{Deserialize, Serialize};

use crate::domain::{ReviewMatch, ReviewQuery, ReviewSummary};

/// One review as read from an ingestion file (`{"text": "...", "Rating": 5}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReviewRequest {
    #[serde(alias = "Review", alias = "review")]
    pub text: String,
    #[serde(rename = "Rating", alias = "rating")]
    pub rating: f64,
}

/// Result of adding one review. `inserted` is false when an identical review was
/// already stored and has been overwritten in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub review: ReviewSummary,
    pub inserted: bool,
}

/// Retrieval and model output for one branch of an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub query: ReviewQuery,
    pub matches: Vec<ReviewMatch>,
    pub analysis: String,
}

/// Everything an analysis run produced, in addition to what was printed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub backend: String,
    pub model: String,
    pub positive: AnalysisSection,
    pub negative: AnalysisSection,
}
