use std::path::{Path, PathBuf};

use bincode::Options;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use sled::{Config, Db, IVec, Tree};
use tracing::debug;
use uuid::Uuid;

use crate::{
    application::services::VectorStore,
    domain::{CollectionInfo, DomainError, RatingFilter, ReviewEmbedding, ReviewRecord},
};

const COLLECTIONS_TREE: &str = "collections";
const REVIEWS_TREE_PREFIX: &str = "reviews/";
/// Files sled 0.34 writes at the root of every database directory.
const SLED_MARKER_FILES: [&str; 2] = ["conf", "db"];

/// Embedded vector store backed by `sled`.
///
/// Collection metadata lives in one tree; each collection's `ReviewRecord`
/// payloads live in a tree of their own. Similarity is a cosine scan over the
/// filtered records, which is fine for review datasets of a few hundred
/// thousand entries and keeps the store embeddable.
pub struct SledVectorStore {
    db: Db,
    collections: Tree,
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SledVectorStore {
    /// Opens (or creates) a sled database rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|err| {
            DomainError::storage(format!("failed to create data directory {:?}: {err}", dir))
        })?;

        let db = Config::default()
            .path(&dir)
            .cache_capacity(64 * 1024 * 1024)
            .mode(sled::Mode::HighThroughput)
            .open()
            .map_err(|err| DomainError::storage(format!("failed to open sled db: {err}")))?;

        let collections = db.open_tree(COLLECTIONS_TREE).map_err(|err| {
            DomainError::storage(format!("failed to open collections tree: {err}"))
        })?;

        Ok(Self {
            db,
            collections,
            data_dir: dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Opens a store that must already exist on disk.
    ///
    /// A directory without sled's `conf` and `db` files is not treated as a store, and
    /// nothing is written into it.
    pub fn open_existing(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = data_dir.as_ref();
        if !dir.is_dir() {
            return Err(DomainError::not_found(format!(
                "vector store {:?} does not exist; ingest reviews first",
                dir
            )));
        }
        if !Self::is_store(dir) {
            return Err(DomainError::not_found(format!(
                "{:?} does not hold a review-lens vector store; ingest reviews first",
                dir
            )));
        }
        Self::open(dir)
    }

    fn is_store(dir: &Path) -> bool {
        SLED_MARKER_FILES
            .iter()
            .all(|name| dir.join(name).is_file())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .serialize(value)
            .map_err(|err| DomainError::storage(format!("serialization error: {err}")))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(bytes)
            .map_err(|err| DomainError::storage(format!("deserialization error: {err}")))
    }

    fn encode_key(id: &Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn decode_record(bytes: &IVec) -> Result<ReviewRecord, DomainError> {
        Self::deserialize(bytes.as_ref())
    }

    /// Tree holding one collection's records. Fails if the collection was never created.
    fn reviews_tree(&self, collection: &str) -> Result<Tree, DomainError> {
        let known = self
            .collections
            .contains_key(collection.as_bytes())
            .map_err(|err| DomainError::storage(format!("failed to read collections: {err}")))?;
        if !known {
            return Err(DomainError::not_found(format!(
                "collection `{collection}` does not exist"
            )));
        }

        self.db
            .open_tree(format!("{REVIEWS_TREE_PREFIX}{collection}"))
            .map_err(|err| {
                DomainError::storage(format!("failed to open tree for `{collection}`: {err}"))
            })
    }

    /// Cosine similarity; a zero vector scores 0 against everything.
    fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, DomainError> {
        if query.len() != candidate.len() {
            return Err(DomainError::embedding(format!(
                "embedding dimension mismatch: query {} vs candidate {}",
                query.len(),
                candidate.len()
            )));
        }

        let mut dot = 0.0f32;
        let mut q_norm = 0.0f32;
        let mut c_norm = 0.0f32;

        for (q, c) in query.iter().zip(candidate.iter()) {
            dot += q * c;
            q_norm += q * q;
            c_norm += c * c;
        }

        let denom = q_norm.sqrt() * c_norm.sqrt();
        if denom == 0.0 {
            return Ok(0.0);
        }

        Ok((dot / denom).clamp(-1.0, 1.0))
    }
}

impl VectorStore for SledVectorStore {
    fn create_collection(&self, info: &CollectionInfo) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock();

        let bytes = Self::serialize(info)?;
        let previous = self
            .collections
            .compare_and_swap(info.name.as_bytes(), None as Option<&[u8]>, Some(bytes))
            .map_err(|err| DomainError::storage(format!("failed to create collection: {err}")))?;
        if previous.is_err() {
            return Err(DomainError::validation(format!(
                "collection `{}` already exists",
                info.name
            )));
        }

        self.collections
            .flush()
            .map_err(|err| DomainError::storage(format!("failed to flush collections: {err}")))?;

        debug!(
            target: "review_lens::store",
            collection = %info.name,
            model = %info.embedding_model,
            dims = info.dimensions,
            "collection created"
        );
        Ok(())
    }

    fn collection(&self, name: &str) -> Result<Option<CollectionInfo>, DomainError> {
        self.collections
            .get(name.as_bytes())
            .map_err(|err| DomainError::storage(format!("failed to read collections: {err}")))?
            .map(|bytes| Self::deserialize(bytes.as_ref()))
            .transpose()
    }

    fn persist(&self, collection: &str, record: &ReviewRecord) -> Result<bool, DomainError> {
        let tree = self.reviews_tree(collection)?;
        let _guard = self.write_lock.lock();

        let bytes = Self::serialize(record)?;
        let previous = tree
            .insert(Self::encode_key(&record.id), bytes)
            .map_err(|err| DomainError::storage(format!("failed to persist review: {err}")))?;

        tree.flush()
            .map_err(|err| DomainError::storage(format!("failed to flush reviews: {err}")))?;

        Ok(previous.is_none())
    }

    fn search(
        &self,
        collection: &str,
        embedding: &ReviewEmbedding,
        limit: usize,
        filter: &RatingFilter,
    ) -> Result<Vec<(ReviewRecord, f32)>, DomainError> {
        let tree = self.reviews_tree(collection)?;
        let mut scored: Vec<(ReviewRecord, f32)> = Vec::new();

        for entry in tree.iter() {
            let (_, value) = entry.map_err(|err| {
                DomainError::storage(format!("failed to read review record: {err}"))
            })?;
            let record = Self::decode_record(&value)?;

            if !record.matches_filter(filter) {
                continue;
            }

            let score = Self::cosine_similarity(&embedding.vector, &record.embedding.vector)?;

            scored.push((record, score));
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        Ok(scored)
    }

    fn count(&self, collection: &str) -> Result<usize, DomainError> {
        Ok(self.reviews_tree(collection)?.len())
    }

    fn ping(&self) -> Result<(), DomainError> {
        self.db
            .flush()
            .map_err(|err| DomainError::storage(format!("failed to flush db: {err}")))?;

        Ok(())
    }
}
