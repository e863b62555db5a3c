use std::io::Write;

use tracing::info;

use crate::{
    application::{
        dtos::{AnalysisReport, AnalysisSection},
        prompt::{excerpt, join_documents, PromptTemplate},
        services::ReviewCollection,
    },
    domain::{DomainError, RatingFilter, ReviewMatch, ReviewQuery},
};

const BANNER: &str = "###########################################";

pub const POSITIVE_QUESTION: &str =
    "What's the key to great customer satisfaction based on detailed positive reviews?";
pub const NEGATIVE_QUESTION: &str =
    "Which of these poor reviews has the worst implications about our dealership? Explain why.";

/// A large-language-model provider reachable through a single request/response call.
pub trait ModelBackend: Send + Sync {
    /// Identifier used in output banners (`openai`, `gemini`, `claude`).
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;

    /// Sends `system_context` as the system instruction and `user_question` as the user
    /// turn, returning the extracted answer text.
    fn generate(
        &self,
        system_context: &str,
        user_question: &str,
        model: &str,
    ) -> Result<String, DomainError>;
}

/// Knobs for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub template: PromptTemplate,
    pub positive: ReviewQuery,
    pub negative: ReviewQuery,
    pub separator: String,
    pub excerpt_chars: usize,
    /// Overrides the backend's default model when set.
    pub model: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            template: PromptTemplate::default(),
            positive: ReviewQuery::new(POSITIVE_QUESTION, 10, RatingFilter::at_least(3.0)),
            negative: ReviewQuery::new(NEGATIVE_QUESTION, 5, RatingFilter::at_most(3.0)),
            separator: ",".into(),
            excerpt_chars: 1000,
            model: None,
        }
    }
}

/// Drives retrieval, prompt assembly, and model dispatch for both review branches.
pub struct ReviewAnalyzer {
    collection: ReviewCollection,
    backend: Box<dyn ModelBackend>,
    config: AnalysisConfig,
}

impl ReviewAnalyzer {
    pub fn new(
        collection: ReviewCollection,
        backend: Box<dyn ModelBackend>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            collection,
            backend,
            config,
        }
    }

    pub fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }

    /// Runs the positive and negative branches in order, writing excerpts and analyses
    /// to `out` as soon as each is available.
    pub fn run(&self, out: &mut dyn Write) -> Result<AnalysisReport, DomainError> {
        let positive = self.collection.query(&self.config.positive)?;
        let positive_context = join_documents(&positive, &self.config.separator);
        emit(out, "Good reviews (excerpt):")?;
        emit(out, excerpt(&positive_context, self.config.excerpt_chars))?;
        emit(out, BANNER)?;

        let negative = self.collection.query(&self.config.negative)?;
        let negative_context = join_documents(&negative, &self.config.separator);
        emit(out, "Worst review (excerpt):")?;
        match negative.first() {
            Some(worst) => emit(out, excerpt(&worst.text, self.config.excerpt_chars))?,
            None => emit(out, "(no matching reviews)")?,
        }
        emit(out, BANNER)?;

        let name = self.backend.name();
        let summary = self.analyze(&positive, &positive_context, &self.config.positive)?;
        emit(out, &format!("{name} generated summary of good reviews:\n"))?;
        emit(out, &summary)?;
        emit(out, BANNER)?;

        let worst = self.analyze(&negative, &negative_context, &self.config.negative)?;
        emit(out, &format!("{name} generated analysis of worst review:\n"))?;
        emit(out, &worst)?;

        Ok(AnalysisReport {
            backend: name.to_string(),
            model: self.model().to_string(),
            positive: AnalysisSection {
                query: self.config.positive.clone(),
                matches: positive,
                analysis: summary,
            },
            negative: AnalysisSection {
                query: self.config.negative.clone(),
                matches: negative,
                analysis: worst,
            },
        })
    }

    fn analyze(
        &self,
        matches: &[ReviewMatch],
        context: &str,
        query: &ReviewQuery,
    ) -> Result<String, DomainError> {
        let system_context = self.config.template.render(context);
        let model = self.model();

        info!(
            target: "review_lens::analysis",
            backend = self.backend.name(),
            model,
            filter = %query.filter,
            documents = matches.len(),
            context_chars = context.chars().count(),
            "dispatching prompt"
        );

        self.backend
            .generate(&system_context, query.question.trim(), model)
    }
}

fn emit(out: &mut dyn Write, line: &str) -> Result<(), DomainError> {
    writeln!(out, "{line}")
        .map_err(|err| DomainError::other(format!("failed to write output: {err}")))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        application::{dtos::IngestReviewRequest, services::{EmbeddingEngine, VectorStore}},
        infrastructure::{SimpleEmbedEngine, SledVectorStore},
    };

    const MODEL: &str = "review-lens/simple-hash";

    struct FixedBackend {
        reply: Result<&'static str, &'static str>,
        fail_on_call: Option<usize>,
        calls: Arc<AtomicUsize>,
        contexts: Arc<parking_lot::Mutex<Vec<(String, String, String)>>>,
    }

    impl FixedBackend {
        fn ok(reply: &'static str) -> Self {
            Self {
                reply: Ok(reply),
                fail_on_call: None,
                calls: Arc::new(AtomicUsize::new(0)),
                contexts: Arc::new(parking_lot::Mutex::new(Vec::new())),
            }
        }
    }

    impl ModelBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn default_model(&self) -> &str {
            "fixed-model"
        }

        fn generate(
            &self,
            system_context: &str,
            user_question: &str,
            model: &str,
        ) -> Result<String, DomainError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.contexts.lock().push((
                system_context.to_string(),
                user_question.to_string(),
                model.to_string(),
            ));
            if self.fail_on_call == Some(call) {
                return Err(DomainError::request("provider returned 500"));
            }
            self.reply
                .map(str::to_string)
                .map_err(DomainError::request)
        }
    }

    fn collection(dir: &tempfile::TempDir, reviews: &[(&str, f64)]) -> ReviewCollection {
        let store: Arc<dyn VectorStore> = Arc::new(SledVectorStore::open(dir.path()).unwrap());
        let embedder: Arc<dyn EmbeddingEngine> = Arc::new(SimpleEmbedEngine::new(MODEL, 64));
        let collection =
            ReviewCollection::create_or_open(store, embedder, MODEL, "car_reviews").unwrap();
        for (text, rating) in reviews {
            collection
                .add(IngestReviewRequest {
                    text: (*text).into(),
                    rating: *rating,
                })
                .unwrap();
        }
        collection
    }

    fn fixture_reviews() -> Vec<(&'static str, f64)> {
        vec![
            ("Great service!", 5.0),
            ("Terrible experience", 1.0),
            ("Decent, could be better", 3.0),
        ]
    }

    #[test]
    fn test_backend_reply_appears_in_both_sections() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = ReviewAnalyzer::new(
            collection(&dir, &fixture_reviews()),
            Box::new(FixedBackend::ok("OK")),
            AnalysisConfig::default(),
        );

        let mut out = Vec::new();
        let report = analyzer.run(&mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        let summary_banner = "fixed generated summary of good reviews:\n\nOK\n";
        let worst_banner = "fixed generated analysis of worst review:\n\nOK\n";
        assert!(printed.contains(summary_banner), "{printed}");
        assert!(printed.contains(worst_banner), "{printed}");
        assert_eq!(report.positive.analysis, "OK");
        assert_eq!(report.negative.analysis, "OK");
        assert_eq!(report.positive.matches.len(), 2);
        assert_eq!(report.negative.matches.len(), 2);
        assert_eq!(report.model, "fixed-model");
    }

    #[test]
    fn test_output_follows_fixed_section_order() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = ReviewAnalyzer::new(
            collection(&dir, &fixture_reviews()),
            Box::new(FixedBackend::ok("OK")),
            AnalysisConfig::default(),
        );

        let mut out = Vec::new();
        analyzer.run(&mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        let good = printed.find("Good reviews (excerpt):").unwrap();
        let worst = printed.find("Worst review (excerpt):").unwrap();
        let summary = printed.find("generated summary of good reviews").unwrap();
        let analysis = printed.find("generated analysis of worst review").unwrap();
        assert!(good < worst && worst < summary && summary < analysis);
    }

    #[test]
    fn test_prompts_carry_context_and_questions() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FixedBackend::ok("OK");
        let contexts = Arc::clone(&backend.contexts);
        let config = AnalysisConfig {
            model: Some("override-model".into()),
            ..AnalysisConfig::default()
        };
        let analyzer = ReviewAnalyzer::new(
            collection(&dir, &fixture_reviews()),
            Box::new(backend),
            config,
        );

        analyzer.run(&mut Vec::new()).unwrap();

        let calls = contexts.lock();
        assert_eq!(calls.len(), 2);
        let (system, question, model) = &calls[0];
        assert!(system.starts_with("You are a customer success employee"));
        assert!(system.contains("Great service!"));
        assert!(!system.contains("Terrible experience"));
        assert_eq!(question, POSITIVE_QUESTION);
        assert_eq!(model, "override-model");

        let (system, question, _) = &calls[1];
        assert!(system.contains("Terrible experience"));
        assert!(!system.contains("Great service!"));
        assert_eq!(question, NEGATIVE_QUESTION);
    }

    #[test]
    fn test_failure_keeps_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FixedBackend {
            fail_on_call: Some(2),
            ..FixedBackend::ok("first answer")
        };
        let calls = Arc::clone(&backend.calls);
        let analyzer = ReviewAnalyzer::new(
            collection(&dir, &fixture_reviews()),
            Box::new(backend),
            AnalysisConfig::default(),
        );

        let mut out = Vec::new();
        let err = analyzer.run(&mut out).unwrap_err();
        let printed = String::from_utf8(out).unwrap();

        assert!(matches!(err, DomainError::Request(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(printed.contains("Worst review (excerpt):"));
        assert!(printed.contains("first answer"));
        assert!(!printed.contains("generated analysis of worst review"));
    }

    #[test]
    fn test_empty_negative_branch_still_dispatches() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = ReviewAnalyzer::new(
            collection(&dir, &[("Great service!", 5.0)]),
            Box::new(FixedBackend::ok("OK")),
            AnalysisConfig::default(),
        );

        let mut out = Vec::new();
        let report = analyzer.run(&mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert!(printed.contains("(no matching reviews)"));
        assert!(report.negative.matches.is_empty());
        assert_eq!(report.negative.analysis, "OK");
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let long_review = format!("great {}", "x".repeat(50));
        let config = AnalysisConfig {
            excerpt_chars: 10,
            ..AnalysisConfig::default()
        };
        let analyzer = ReviewAnalyzer::new(
            collection(&dir, &[(long_review.as_str(), 4.0)]),
            Box::new(FixedBackend::ok("OK")),
            config,
        );

        let mut out = Vec::new();
        analyzer.run(&mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert!(printed.starts_with("Good reviews (excerpt):\ngreat xxxx\n"));
    }
}
