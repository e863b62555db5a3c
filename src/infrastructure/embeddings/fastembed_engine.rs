use std::path::Path;
use std::str::FromStr;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use parking_lot::Mutex;
use tracing::info;

use crate::{application::services::EmbeddingEngine, domain::DomainError};

/// Sentence-transformers names that fastembed ships under its own model codes.
const SENTENCE_TRANSFORMER_ALIASES: &[(&str, EmbeddingModel)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2),
];

/// Maps a configured model label onto a fastembed model.
///
/// Accepts fastembed codes (`Qdrant/all-MiniLM-L6-v2-onnx`) as well as the plain or
/// `sentence-transformers/`-prefixed names review datasets are usually embedded with.
pub fn resolve_model(label: &str) -> Result<EmbeddingModel, DomainError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(DomainError::config("fastembed model name cannot be empty"));
    }

    let bare = label.trim_start_matches("sentence-transformers/");
    if let Some((_, model)) = SENTENCE_TRANSFORMER_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(bare))
    {
        return Ok(model.clone());
    }

    EmbeddingModel::from_str(label).map_err(|err| {
        DomainError::config(format!(
            "`{label}` is not a fastembed model; use a fastembed code such as \
             `Qdrant/all-MiniLM-L6-v2-onnx`: {err}"
        ))
    })
}

/// Review embedder backed by a local ONNX sentence model.
pub struct FastEmbedEngine {
    model_label: String,
    dimensions: usize,
    inner: Mutex<TextEmbedding>,
}

impl FastEmbedEngine {
    /// Loads (downloading on first use) the model named by `model_name`.
    ///
    /// Weights are cached under `cache_dir` when given, so ingestion and analysis
    /// runs share one download.
    pub fn try_new(
        model_name: impl AsRef<str>,
        cache_dir: Option<&Path>,
    ) -> Result<Self, DomainError> {
        let label = model_name.as_ref().trim().to_string();
        let embedding_model = resolve_model(&label)?;

        let dimensions = TextEmbedding::get_model_info(&embedding_model)
            .map_err(|err| DomainError::config(format!("no metadata for `{label}`: {err}")))?
            .dim;

        let mut options = TextInitOptions::new(embedding_model);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir.to_path_buf());
        }
        let text_embedding = TextEmbedding::try_new(options).map_err(|err| {
            DomainError::config(format!("failed to load review embedder `{label}`: {err}"))
        })?;

        info!(
            target: "review_lens::embeddings",
            model = %label,
            dims = dimensions,
            cache = ?cache_dir,
            "fastembed model loaded"
        );

        Ok(Self {
            model_label: label,
            dimensions,
            inner: Mutex::new(text_embedding),
        })
    }
}

impl EmbeddingEngine for FastEmbedEngine {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        if !model.eq_ignore_ascii_case(&self.model_label) {
            return Err(DomainError::embedding(format!(
                "collection expects `{model}` but `{}` is loaded",
                self.model_label
            )));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("cannot embed an empty review"));
        }

        let vector = self
            .inner
            .lock()
            .embed(vec![text], None)
            .map_err(|err| DomainError::embedding(format!("review embedding failed: {err}")))?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::embedding("fastembed returned no vector"))?;

        if vector.len() != self.dimensions {
            return Err(DomainError::embedding(format!(
                "expected {}-dimensional vector, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn dims(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}
