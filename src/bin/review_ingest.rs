use clap::Parser;

use review_lens::{cli::IngestCli, init_tracing, run_ingest};

/// Embed reviews from a JSON Lines file and store them in the configured collection.
///
/// Each line holds one object such as `{"text": "Great service!", "Rating": 5}`.
fn main() {
    let args = IngestCli::parse();
    init_tracing();

    match run_ingest(args) {
        Ok(total) => println!("collection now holds {total} reviews"),
        Err(err) => {
            eprintln!("[review-ingest] Ingestion failed: {err:?}");
            std::process::exit(1);
        }
    }
}
