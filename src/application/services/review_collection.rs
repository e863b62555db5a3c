use std::sync::Arc;

use tracing::debug;

use crate::{
    application::dtos::{IngestOutcome, IngestReviewRequest},
    domain::{
        CollectionInfo, DomainError, RatingFilter, ReviewEmbedding, ReviewMatch, ReviewQuery,
        ReviewRecord,
    },
};

const MAX_TEXT_CHARS: usize = 16_000;

/// Abstraction over any embedding engine (hashed tokens, FastEmbed, ...).
pub trait EmbeddingEngine: Send + Sync {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError>;

    fn dims(&self, _model: &str) -> Option<usize> {
        None
    }
}

/// Contract for the embedded vector storage engine.
pub trait VectorStore: Send + Sync {
    fn create_collection(&self, info: &CollectionInfo) -> Result<(), DomainError>;

    fn collection(&self, name: &str) -> Result<Option<CollectionInfo>, DomainError>;

    /// Writes `record` under its id. Returns `false` when it replaced an existing entry.
    fn persist(&self, collection: &str, record: &ReviewRecord) -> Result<bool, DomainError>;

    fn search(
        &self,
        collection: &str,
        embedding: &ReviewEmbedding,
        limit: usize,
        filter: &RatingFilter,
    ) -> Result<Vec<(ReviewRecord, f32)>, DomainError>;

    fn count(&self, collection: &str) -> Result<usize, DomainError>;

    fn ping(&self) -> Result<(), DomainError>;
}

/// Handle to one named collection, bound to the embedding engine it was built with.
pub struct ReviewCollection {
    info: CollectionInfo,
    embedder: Arc<dyn EmbeddingEngine>,
    store: Arc<dyn VectorStore>,
}

impl ReviewCollection {
    /// Opens an existing collection.
    ///
    /// Fails with `NotFound` when the collection was never created and with
    /// `Embedding` when it was built with another model or vector size.
    pub fn open(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingEngine>,
        embedding_model: &str,
        name: &str,
    ) -> Result<Self, DomainError> {
        let info = store
            .collection(name)?
            .ok_or_else(|| DomainError::not_found(format!("collection `{name}` does not exist")))?;

        if !info.embedding_model.eq_ignore_ascii_case(embedding_model) {
            return Err(DomainError::embedding(format!(
                "collection `{name}` was built with `{}` but `{embedding_model}` is configured",
                info.embedding_model
            )));
        }
        if let Some(dims) = embedder.dims(embedding_model) {
            if dims != info.dimensions {
                return Err(DomainError::embedding(format!(
                    "collection `{name}` stores {}-dimensional vectors, engine produces {dims}",
                    info.dimensions
                )));
            }
        }

        debug!(
            target: "review_lens::store",
            collection = %info.name,
            model = %info.embedding_model,
            dims = info.dimensions,
            "collection opened"
        );

        Ok(Self {
            info,
            embedder,
            store,
        })
    }

    /// Opens the collection, creating its metadata first when it does not exist yet.
    pub fn create_or_open(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingEngine>,
        embedding_model: &str,
        name: &str,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("collection name cannot be empty"));
        }
        if store.collection(name)?.is_none() {
            let dims = embedder.dims(embedding_model).ok_or_else(|| {
                DomainError::config(format!(
                    "embedding engine does not report dimensions for `{embedding_model}`"
                ))
            })?;
            store.create_collection(&CollectionInfo::new(name, embedding_model, dims))?;
        }
        Self::open(store, embedder, embedding_model, name)
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &CollectionInfo {
        &self.info
    }

    /// Filtered similarity search, most similar first, at most `query.limit` results.
    pub fn query(&self, query: &ReviewQuery) -> Result<Vec<ReviewMatch>, DomainError> {
        let question = query.question.trim();
        if question.is_empty() {
            return Err(DomainError::query("question cannot be empty"));
        }
        if query.limit == 0 {
            return Err(DomainError::query("result count must be at least 1"));
        }
        query.filter.validate()?;

        let vector = self.embedder.embed(&self.info.embedding_model, question)?;
        let embedding = ReviewEmbedding::new(&self.info.embedding_model, vector);

        let matches = self
            .store
            .search(&self.info.name, &embedding, query.limit, &query.filter)
            .map_err(|err| match err {
                DomainError::Storage(msg) => DomainError::query(msg),
                other => other,
            })?;

        debug!(
            target: "review_lens::store",
            collection = %self.info.name,
            filter = %query.filter,
            limit = query.limit,
            returned = matches.len(),
            "similarity query finished"
        );

        Ok(matches.into_iter().map(ReviewMatch::from).collect())
    }

    /// Embeds and persists one review. Re-adding the same text and rating overwrites
    /// the stored copy.
    pub fn add(&self, payload: IngestReviewRequest) -> Result<IngestOutcome, DomainError> {
        Self::validate_payload(&payload)?;

        let vector = self
            .embedder
            .embed(&self.info.embedding_model, payload.text.trim())?;
        let embedding = ReviewEmbedding::new(&self.info.embedding_model, vector);
        if embedding.dims() != self.info.dimensions {
            return Err(DomainError::embedding(format!(
                "unexpected embedding dimension (expected {}, got {})",
                self.info.dimensions,
                embedding.dims()
            )));
        }
        let record = ReviewRecord::new(payload.text, payload.rating, embedding);

        let inserted = self.store.persist(&self.info.name, &record)?;

        Ok(IngestOutcome {
            review: record.as_summary(),
            inserted,
        })
    }

    pub fn count(&self) -> Result<usize, DomainError> {
        self.store.count(&self.info.name)
    }

    fn validate_payload(payload: &IngestReviewRequest) -> Result<(), DomainError> {
        if payload.text.trim().is_empty() {
            return Err(DomainError::validation("review text is required"));
        }
        if payload.text.chars().count() > MAX_TEXT_CHARS {
            return Err(DomainError::limit(format!(
                "review text cannot exceed {MAX_TEXT_CHARS} characters"
            )));
        }
        if !payload.rating.is_finite() {
            return Err(DomainError::validation("rating must be a finite number"));
        }
        Ok(())
    }
}
