use clap::Parser;

use review_lens::{cli::AnalyzeCli, init_tracing, run_analysis};

/// Query the review store twice and print the chosen model's analysis.
///
/// # Usage
///
/// ```text
/// review-lens openai
/// review-lens claude --model claude-haiku-4-5
/// ```
///
/// # Environment Variables
///
/// - `REVIEW_LENS_LOG`: logging filter (trace, debug, info, warn, error)
/// - `REVIEW_LENS_STORE`: override the vector store directory
/// - `OPENAI_API_KEY`, `GEMINI_API_KEY`, `ANTHROPIC_API_KEY`: provider credentials
fn main() {
    let args = AnalyzeCli::parse();
    init_tracing();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = run_analysis(args, &mut out) {
        eprintln!("[review-lens] Run failed: {err:?}");
        std::process::exit(1);
    }
}
