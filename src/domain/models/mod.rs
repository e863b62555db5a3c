use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Stored review text with its rating metadata and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub text: String,
    pub rating: f64,
    pub embedding: ReviewEmbedding,
    pub created_at: DateTime<Utc>,
}

/// Namespace for review ids, so the same text and rating always land on the same key.
const REVIEW_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5d1b_7e0c_93a4_4f2e_b8c1_2a6d_4e9f_0c37);

/// Content-derived id of a review: re-ingesting a review overwrites it instead of
/// adding a copy.
pub fn review_id(text: &str, rating: f64) -> Uuid {
    let name = format!("{rating}\u{1f}{}", text.trim());
    Uuid::new_v5(&REVIEW_ID_NAMESPACE, name.as_bytes())
}

impl ReviewRecord {
    pub fn new(text: impl Into<String>, rating: f64, embedding: ReviewEmbedding) -> Self {
        let text = normalize_text(text);
        Self {
            id: review_id(&text, rating),
            text,
            rating,
            embedding,
            created_at: Utc::now(),
        }
    }

    pub fn matches_filter(&self, filter: &RatingFilter) -> bool {
        filter.accepts(self.rating)
    }

    pub fn as_summary(&self) -> ReviewSummary {
        ReviewSummary {
            id: self.id,
            rating: self.rating,
            excerpt: self.text.chars().take(SUMMARY_EXCERPT_CHARS).collect(),
            created_at: self.created_at,
        }
    }
}

const SUMMARY_EXCERPT_CHARS: usize = 80;

/// Lightweight projection returned after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub id: Uuid,
    pub rating: f64,
    pub excerpt: String,
    pub created_at: DateTime<Utc>,
}

/// Direction of the single comparison a query applies to `Rating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingComparison {
    /// `Rating >= threshold`
    AtLeast,
    /// `Rating <= threshold`
    AtMost,
}

/// Inclusion filter evaluated against a review's `Rating` metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingFilter {
    pub comparison: RatingComparison,
    pub threshold: f64,
}

impl RatingFilter {
    pub fn at_least(threshold: f64) -> Self {
        Self {
            comparison: RatingComparison::AtLeast,
            threshold,
        }
    }

    pub fn at_most(threshold: f64) -> Self {
        Self {
            comparison: RatingComparison::AtMost,
            threshold,
        }
    }

    /// Rejects thresholds no rating could be compared against.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.threshold.is_finite() {
            return Err(DomainError::query(format!(
                "rating threshold must be a finite number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    pub fn accepts(&self, rating: f64) -> bool {
        match self.comparison {
            RatingComparison::AtLeast => rating >= self.threshold,
            RatingComparison::AtMost => rating <= self.threshold,
        }
    }
}

impl std::fmt::Display for RatingFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self.comparison {
            RatingComparison::AtLeast => ">=",
            RatingComparison::AtMost => "<=",
        };
        write!(f, "Rating {op} {}", self.threshold)
    }
}

/// Similarity query against a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQuery {
    pub question: String,
    pub limit: usize,
    pub filter: RatingFilter,
}

impl ReviewQuery {
    pub fn new(question: impl Into<String>, limit: usize, filter: RatingFilter) -> Self {
        Self {
            question: question.into(),
            limit,
            filter,
        }
    }
}

/// One retrieved document with its cosine similarity to the question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewMatch {
    pub id: Uuid,
    pub text: String,
    pub rating: f64,
    pub score: f32,
}

impl From<(ReviewRecord, f32)> for ReviewMatch {
    fn from((record, score): (ReviewRecord, f32)) -> Self {
        Self {
            id: record.id,
            text: record.text,
            rating: record.rating,
            score,
        }
    }
}

/// Vector representation of a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEmbedding {
    pub model: String,
    pub vector: Vec<f32>,
}

impl ReviewEmbedding {
    pub fn new(model: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            vector,
        }
    }

    pub fn dims(&self) -> usize {
        self.vector.len()
    }
}

/// Per-collection metadata pinning the embedding function it was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>, embedding_model: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            embedding_model: embedding_model.into(),
            dimensions: dims,
            created_at: Utc::now(),
        }
    }
}

fn normalize_text(input: impl Into<String>) -> String {
    input.into().trim().to_string()
}
