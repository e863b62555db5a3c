//! Application layer wiring DTOs, prompt assembly, and services for review-lens.

pub mod dtos;
pub mod prompt;
pub mod services;

pub use dtos::{AnalysisReport, AnalysisSection, IngestOutcome, IngestReviewRequest};
pub use services::{AnalysisConfig, ModelBackend, ReviewAnalyzer, ReviewCollection};
