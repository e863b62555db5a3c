use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod settings;

use application::prompt::PromptTemplate;
use application::services::{EmbeddingEngine, VectorStore};
use application::{
    AnalysisConfig, AnalysisReport, IngestReviewRequest, ReviewAnalyzer, ReviewCollection,
};
use cli::{AnalyzeCli, IngestCli};
use domain::DomainError;
#[cfg(feature = "fastembed-engine")]
use infrastructure::FastEmbedEngine;
use infrastructure::{build_backend, SimpleEmbedEngine, SledVectorStore};
use settings::{AppConfig, ConfigManager, EmbeddingBackend};

/// Store, embedding engine, and settings for one process.
pub struct AppHandles {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingEngine>,
    pub config: AppConfig,
}

impl AppHandles {
    pub fn embedding_model(&self) -> &str {
        self.config.embedding.model_name()
    }

    /// Opens the configured collection; it must already exist.
    pub fn open_collection(&self) -> Result<ReviewCollection, DomainError> {
        ReviewCollection::open(
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            self.embedding_model(),
            &self.config.collection,
        )
    }

    pub fn create_or_open_collection(&self) -> Result<ReviewCollection, DomainError> {
        ReviewCollection::create_or_open(
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            self.embedding_model(),
            &self.config.collection,
        )
    }
}

/// Entry point of the `review-lens` binary: both analysis branches against one backend.
pub fn run_analysis(args: AnalyzeCli, out: &mut dyn Write) -> Result<AnalysisReport> {
    let config = ConfigManager::new(args.config)
        .load_with_env()
        .context("failed to load configuration")?;

    // Backend first: unusable providers fail before the store is touched.
    let backend = build_backend(args.backend, &config.providers, config.request_timeout())
        .with_context(|| format!("failed to initialise {} backend", args.backend))?;

    let handles = build_environment(config, false).context("failed to bootstrap review-lens")?;
    let collection = handles
        .open_collection()
        .context("failed to open review collection")?;

    let analysis = AnalysisConfig {
        template: PromptTemplate::default(),
        separator: handles.config.join_separator.clone(),
        excerpt_chars: handles.config.excerpt_chars,
        model: args.model,
        ..AnalysisConfig::default()
    };

    let analyzer = ReviewAnalyzer::new(collection, backend, analysis);
    let report = analyzer.run(out).context("analysis run failed")?;

    info!(
        target: "review_lens::analysis",
        backend = %report.backend,
        model = %report.model,
        positive = report.positive.matches.len(),
        negative = report.negative.matches.len(),
        "analysis finished"
    );
    Ok(report)
}

/// Entry point of the `review-ingest` binary. Returns the number of reviews stored.
pub fn run_ingest(args: IngestCli) -> Result<usize> {
    let config = ConfigManager::new(args.config)
        .load_with_env()
        .context("failed to load configuration")?;

    let reviews = read_reviews(&args.file)?;
    let handles = build_environment(config, true).context("failed to bootstrap review-lens")?;
    let collection = handles
        .create_or_open_collection()
        .context("failed to open review collection")?;

    let mut replaced = 0usize;
    for (idx, review) in reviews.into_iter().enumerate() {
        let outcome = collection
            .add(review)
            .with_context(|| format!("failed to ingest review #{}", idx + 1))?;
        debug!(
            target: "review_lens::ingest",
            id = %outcome.review.id,
            rating = outcome.review.rating,
            excerpt = %outcome.review.excerpt,
            inserted = outcome.inserted,
            "review stored"
        );
        if !outcome.inserted {
            replaced += 1;
        }
        if (idx + 1) % 500 == 0 {
            info!(target: "review_lens::ingest", ingested = idx + 1, "progress");
        }
    }

    let total = collection.count()?;
    info!(
        target: "review_lens::ingest",
        collection = collection.name(),
        model = %collection.info().embedding_model,
        replaced,
        total,
        "ingestion finished"
    );
    Ok(total)
}

/// Opens the store and embedding engine named by `config`.
///
/// With `create` unset the store directory must already exist.
pub fn build_environment(config: AppConfig, create: bool) -> Result<AppHandles> {
    let store_impl = if create {
        SledVectorStore::open(&config.store_path)
    } else {
        SledVectorStore::open_existing(&config.store_path)
    }
    .with_context(|| format!("failed to open vector store at {:?}", config.store_path))?;
    let data_dir = store_impl.data_dir().to_path_buf();
    let store: Arc<dyn VectorStore> = Arc::new(store_impl);
    store.ping().context("vector store is not readable")?;

    let embedder =
        init_embedder(&config.embedding).context("failed to initialise embedding backend")?;

    info!(
        target: "review_lens::store",
        path = ?data_dir,
        collection = %config.collection,
        embedding = config.embedding.id(),
        model = config.embedding.model_name(),
        "environment ready"
    );

    Ok(AppHandles {
        store,
        embedder,
        config,
    })
}

pub fn init_embedder(backend: &EmbeddingBackend) -> Result<Arc<dyn EmbeddingEngine>, DomainError> {
    match backend {
        EmbeddingBackend::Simple { model, dimensions } => {
            let engine = SimpleEmbedEngine::try_new(model.clone(), *dimensions)?;
            Ok(Arc::new(engine))
        }
        #[cfg(feature = "fastembed-engine")]
        EmbeddingBackend::FastEmbed { model, cache_dir } => {
            let engine = FastEmbedEngine::try_new(model, cache_dir.as_deref())?;
            Ok(Arc::new(engine))
        }
    }
}

/// Reads reviews from JSON Lines, or from a single JSON array.
pub fn read_reviews(path: &Path) -> Result<Vec<IngestReviewRequest>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read reviews from {:?}", path))?;
    parse_reviews(&contents).with_context(|| format!("failed to parse {:?}", path))
}

pub fn parse_reviews(contents: &str) -> Result<Vec<IngestReviewRequest>> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents).context("invalid JSON array of reviews");
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|err| anyhow!("line {}: {err}", idx + 1))
        })
        .collect()
}

/// Logs go to stderr so stdout carries only the analysis output.
pub fn init_tracing() {
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var("REVIEW_LENS_LOG").unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines_skips_blank_lines() {
        let reviews = parse_reviews(
            "{\"text\":\"Great service!\",\"Rating\":5}\n\n{\"text\":\"Terrible experience\",\"Rating\":1}\n",
        )
        .unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[1].text, "Terrible experience");
        assert_eq!(reviews[1].rating, 1.0);
    }

    #[test]
    fn test_parse_json_array() {
        let reviews =
            parse_reviews(r#"[{"text":"Decent, could be better","Rating":3}]"#).unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 3.0);
    }

    #[test]
    fn test_parse_error_names_the_line() {
        let err = parse_reviews("{\"text\":\"ok\",\"Rating\":4}\n{\"text\":\"missing rating\"}")
            .unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "{err}");
    }

    #[test]
    fn test_analysis_requires_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            store_path: dir.path().join("missing"),
            ..AppConfig::default()
        };
        let err = build_environment(config, false).err().unwrap();
        let domain = err.downcast_ref::<DomainError>();
        assert!(matches!(domain, Some(DomainError::NotFound(_))), "{err:?}");
    }

    #[test]
    fn test_analysis_does_not_write_into_foreign_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chroma.sqlite3"), b"SQLite format 3").unwrap();
        let config = AppConfig {
            store_path: dir.path().to_path_buf(),
            ..AppConfig::default()
        };

        let err = build_environment(config, false).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::NotFound(_))
        ));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["chroma.sqlite3".to_string()]);
    }

    #[test]
    fn test_zero_dimension_embedder_is_config_error() {
        let backend = EmbeddingBackend::Simple {
            model: "m".into(),
            dimensions: 0,
        };
        assert!(matches!(
            init_embedder(&backend),
            Err(DomainError::Config(_))
        ));
    }
}
