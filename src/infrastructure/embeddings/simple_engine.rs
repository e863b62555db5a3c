use ahash::AHasher;
use std::hash::{Hash, Hasher};

use crate::{application::services::EmbeddingEngine, domain::DomainError};

pub const DEFAULT_SIMPLE_MODEL: &str = "review-lens/simple-hash";
pub const DEFAULT_SIMPLE_DIMENSIONS: usize = 384;

/// A lightweight, deterministic embedding engine that hashes lowercased tokens into a
/// fixed-size vector. Reviews sharing vocabulary with the question score higher, which is
/// enough to run the pipeline offline without downloading model weights.
pub struct SimpleEmbedEngine {
    model_name: String,
    dimensions: usize,
}

impl SimpleEmbedEngine {
    pub fn try_new(model_name: impl Into<String>, dimensions: usize) -> Result<Self, DomainError> {
        let model_name = model_name.into();
        if model_name.trim().is_empty() {
            return Err(DomainError::config("embedding model name cannot be empty"));
        }
        if dimensions == 0 {
            return Err(DomainError::config(
                "embedding dimensions must be greater than zero",
            ));
        }
        let dims = dimensions.clamp(8, 4096);
        Ok(Self {
            model_name,
            dimensions: dims,
        })
    }

    /// # Panics
    ///
    /// Panics on an empty model name or zero dimensions.
    pub fn new(model_name: impl Into<String>, dimensions: usize) -> Self {
        Self::try_new(model_name, dimensions).expect("valid simple embedder configuration")
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    fn hash_token(token: &str) -> usize {
        // Default hasher uses fixed keys: stored vectors must match query vectors across runs.
        let mut hasher = AHasher::default();
        token.hash(&mut hasher);
        hasher.finish() as usize
    }

    fn embed_internal(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in Self::tokenize(text) {
            let idx = Self::hash_token(&token) % self.dimensions;
            vector[idx] += 1.0;
        }

        // L2 normalize to keep scores in [-1, 1]
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl Default for SimpleEmbedEngine {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_SIMPLE_MODEL.to_string(),
            dimensions: DEFAULT_SIMPLE_DIMENSIONS,
        }
    }
}

impl EmbeddingEngine for SimpleEmbedEngine {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        if !model.eq_ignore_ascii_case(&self.model_name) {
            return Err(DomainError::embedding(format!(
                "engine initialised for `{}` but `{}` requested",
                self.model_name, model
            )));
        }
        if text.trim().is_empty() {
            return Err(DomainError::validation("text payload cannot be empty"));
        }
        Ok(self.embed_internal(text))
    }

    fn dims(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}
