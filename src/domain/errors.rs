use thiserror::Error;

/// Domain-level errors shared across application components.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The incoming payload missed a required field or violated invariants.
    #[error("validation error: {0}")]
    Validation(String),

    /// Input exceeded guard rails such as maximum length.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Store directory or collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Catch-all for storage-related failures we don't want to leak directly.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Vector store incompatibility (e.g., dimension or model mismatch).
    #[error("embedding mismatch: {0}")]
    Embedding(String),

    /// Bad settings: unknown backend, unusable embedding model, malformed config file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Similarity query could not be executed.
    #[error("query error: {0}")]
    Query(String),

    /// Prompt template does not have exactly one substitution slot.
    #[error("template error: {0}")]
    Template(String),

    /// Selected model provider cannot be used (compiled out or missing credentials).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Network or provider-side failure.
    #[error("request failed: {0}")]
    Request(String),

    /// Provider response has no extractable text.
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    /// Any other unexpected failure.
    #[error("unexpected error: {0}")]
    Other(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn limit(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn response_shape(msg: impl Into<String>) -> Self {
        Self::ResponseShape(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
