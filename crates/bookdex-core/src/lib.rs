pub mod error;
pub mod llm;
pub mod locate;
pub mod model;
pub mod parse;
pub mod source;

pub use error::BookdexError;
pub use llm::DispatchLimits;
pub use model::{IndexEntry, IndexLocation, Occurrence, ParseReport};

use llm::client::CompletionClient;
use source::{PageSource, TextMode};
use std::sync::Arc;
use tracing::info;

/// A document under analysis: owns the page source, the located index
/// section, and the extracted index entries.
pub struct Document {
    source: Box<dyn PageSource>,
    location: Option<IndexLocation>,
    entries: Vec<IndexEntry>,
}

impl Document {
    pub fn open(source: Box<dyn PageSource>) -> Document {
        Document {
            source,
            location: None,
            entries: Vec::new(),
        }
    }

    /// Locate phase: printed-page offset estimation and index-page
    /// detection in a single pass over all pages.
    ///
    /// Idempotent: a second call returns the cached location without
    /// rescanning.
    pub fn locate_index(&mut self) -> Result<IndexLocation, BookdexError> {
        if let Some(ref location) = self.location {
            return Ok(location.clone());
        }
        let location = locate::locate(self.source.as_ref())?;
        self.location = Some(location.clone());
        Ok(location)
    }

    /// Parse the located index pages with the deterministic strategy.
    ///
    /// Runs the locate phase first if needed. Previous entries are cleared,
    /// so re-running replaces results instead of duplicating them.
    pub fn parse_index(&mut self) -> Result<ParseReport, BookdexError> {
        self.locate_index()?;
        let text = self.index_text()?;
        let parsed = parse::parse_index_text(&text);
        self.entries = parsed.entries;
        info!(
            entries = self.entries.len(),
            skipped = parsed.skipped,
            "deterministic parse complete"
        );
        Ok(ParseReport {
            entries: self.entries.len(),
            skipped: parsed.skipped,
            failed_chunks: Vec::new(),
        })
    }

    /// Parse the located index pages by delegating chunks to the completion
    /// service under the given admission limits.
    ///
    /// Runs the locate phase first if needed. Previous entries are cleared,
    /// so re-running replaces results instead of duplicating them.
    pub async fn parse_index_with_model<C>(
        &mut self,
        client: Arc<C>,
        limits: Arc<DispatchLimits>,
    ) -> Result<ParseReport, BookdexError>
    where
        C: CompletionClient + 'static,
    {
        self.locate_index()?;
        let text = self.index_text()?;
        let assisted = llm::parse_index_text(&text, client, limits).await;
        self.entries = assisted.entries;
        info!(
            entries = self.entries.len(),
            failed_chunks = assisted.failed_chunks.len(),
            "model-assisted parse complete"
        );
        Ok(ParseReport {
            entries: self.entries.len(),
            skipped: 0,
            failed_chunks: assisted.failed_chunks,
        })
    }

    /// Entries discovered by the most recent parse, in discovery order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The located index section, if the locate phase has run.
    pub fn location(&self) -> Option<&IndexLocation> {
        self.location.as_ref()
    }

    /// Resolve a printed page number through the page offset and return the
    /// physical page's text.
    pub fn page_text(&self, printed_page: u32) -> Result<String, BookdexError> {
        let location = self.location.as_ref().ok_or(BookdexError::NotLocated)?;
        let physical = i64::from(printed_page) + location.page_offset;
        let count = self.source.page_count()?;
        if physical < 1 || physical as usize > count {
            return Err(BookdexError::PageOutOfRange {
                page: physical.max(0) as usize,
                count,
            });
        }
        self.source.page_text(physical as usize, TextMode::Plain)
    }

    /// Concatenated text of the located index pages, in column-aware
    /// reading order.
    fn index_text(&self) -> Result<String, BookdexError> {
        let location = self.location.as_ref().ok_or(BookdexError::NotLocated)?;
        let mut text = String::new();
        for &page in &location.index_pages {
            text.push_str(&self.source.page_text(page, TextMode::ColumnSorted)?);
            if !text.ends_with('\n') {
                text.push('\n');
            }
        }
        Ok(text)
    }
}
