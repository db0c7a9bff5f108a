use bookdex_core::llm::client::GeminiClient;
use bookdex_core::source::pdftotext::PdftotextSource;
use bookdex_core::{DispatchLimits, Document};
use std::path::PathBuf;
use std::sync::Arc;

use crate::output;

pub async fn run(
    input_file: PathBuf,
    assisted: bool,
    model: Option<String>,
    output_format: &str,
) -> Result<(), bookdex_core::BookdexError> {
    let source = PdftotextSource::open(input_file)?;
    let mut doc = Document::open(Box::new(source));

    let location = doc.locate_index()?;
    if !location.found_index() {
        eprintln!("No index found in this document.");
        return Ok(());
    }

    let report = if assisted {
        let mut client = GeminiClient::from_env()?;
        if let Some(name) = model {
            client = client.with_model(name);
        }
        doc.parse_index_with_model(Arc::new(client), Arc::new(DispatchLimits::default()))
            .await?
    } else {
        doc.parse_index()?
    };

    match output_format {
        "json" => output::json::print(doc.entries())?,
        _ => output::table::print(doc.entries(), &location),
    }

    if report.skipped > 0 {
        eprintln!(
            "  {} occurrence piece(s) skipped during parsing",
            report.skipped
        );
    }
    for chunk in &report.failed_chunks {
        eprintln!("  warning: chunk {chunk} failed and contributed nothing");
    }

    Ok(())
}
