//! Infrastructure layer wiring concrete adapters (embeddings, storage, model backends).

pub mod backends;
pub mod embeddings;
pub mod storage;

pub use backends::{build_backend, select_backend, BackendKind};
#[cfg(feature = "fastembed-engine")]
pub use embeddings::FastEmbedEngine;
pub use embeddings::SimpleEmbedEngine;
pub use storage::SledVectorStore;
