//! Command-line surfaces for the `review-lens` and `review-ingest` binaries.

use std::path::PathBuf;

use clap::Parser;

use crate::infrastructure::BackendKind;

/// Retrieve positive and negative car reviews and have a model analyze them.
#[derive(Debug, Parser)]
#[command(name = "review-lens", version, about)]
pub struct AnalyzeCli {
    /// Model provider to send the prompts to.
    #[arg(value_enum)]
    pub backend: BackendKind,

    /// JSON config file (defaults to ./review-lens.json when present).
    #[arg(long, env = "REVIEW_LENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the provider's configured model.
    #[arg(long)]
    pub model: Option<String>,
}

/// Load reviews from a JSON Lines file into the vector store.
#[derive(Debug, Parser)]
#[command(name = "review-ingest", version, about)]
pub struct IngestCli {
    /// File with one `{"text": "...", "Rating": n}` object per line, or a JSON array.
    pub file: PathBuf,

    /// JSON config file (defaults to ./review-lens.json when present).
    #[arg(long, env = "REVIEW_LENS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definitions_are_consistent() {
        AnalyzeCli::command().debug_assert();
        IngestCli::command().debug_assert();
    }

    #[test]
    fn test_backend_is_a_closed_set() {
        let cli = AnalyzeCli::try_parse_from(["review-lens", "gemini"]).unwrap();
        assert_eq!(cli.backend, BackendKind::Gemini);
        assert!(cli.model.is_none());

        let err = AnalyzeCli::try_parse_from(["review-lens", "mistral"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);

        let err = AnalyzeCli::try_parse_from(["review-lens"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_model_override_and_config_path() {
        let cli = AnalyzeCli::try_parse_from([
            "review-lens",
            "claude",
            "--model",
            "claude-haiku-4-5",
            "--config",
            "/tmp/lens.json",
        ])
        .unwrap();
        assert_eq!(cli.backend, BackendKind::Claude);
        assert_eq!(cli.model.as_deref(), Some("claude-haiku-4-5"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lens.json")));
    }

    #[test]
    fn test_ingest_takes_a_file() {
        let cli = IngestCli::try_parse_from(["review-ingest", "reviews.jsonl"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("reviews.jsonl"));
    }
}
