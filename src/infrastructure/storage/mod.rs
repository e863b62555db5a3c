//! Storage adapters for review-lens.
//!
//! Exposes the embedded sled-backed vector store holding review collections.

pub mod sled_store;

pub use sled_store::SledVectorStore;
