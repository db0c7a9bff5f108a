use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive printed-page range where a term appears.
///
/// Single-page occurrences have `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: u32,
    pub end: u32,
}

impl Occurrence {
    pub fn single(page: u32) -> Occurrence {
        Occurrence { start: page, end: page }
    }

    pub fn range(start: u32, end: u32) -> Occurrence {
        Occurrence { start, end }
    }

    /// Individual printed page numbers covered by this range.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// One index entry: a display term and the printed-page ranges it covers.
///
/// Hierarchical entries use the flattened "subtopic under parent" textual
/// convention; there is no structural parent pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub term: String,
    pub occurrences: Vec<Occurrence>,
}

impl IndexEntry {
    pub fn new(term: impl Into<String>, occurrences: Vec<Occurrence>) -> IndexEntry {
        IndexEntry {
            term: term.into(),
            occurrences,
        }
    }

    /// Expand every occurrence range into individual printed page numbers,
    /// in range order.
    pub fn occurrence_pages(&self) -> Vec<u32> {
        self.occurrences.iter().flat_map(|o| o.pages()).collect()
    }
}

/// Result of the locate phase: which physical pages form the index section
/// and how printed page numbers map onto physical ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexLocation {
    /// Physical page numbers (1-based) of the index section. Contiguous
    /// once finalized; empty means no index was found.
    pub index_pages: Vec<usize>,
    /// `printed_page + page_offset == physical_page`.
    pub page_offset: i64,
    /// True when no printed-page deltas were observed anywhere and the
    /// offset defaulted to 0. Reduced confidence, not an error.
    pub offset_degraded: bool,
}

impl IndexLocation {
    pub fn found_index(&self) -> bool {
        !self.index_pages.is_empty()
    }
}

/// Per-page candidate signals evaluated by the locator. Transient: consumed
/// during the scan, never persisted.
#[derive(Debug, Clone)]
pub struct PageSignal {
    /// Physical page number, 1-based.
    pub page: usize,
    /// Count of `\d+` tokens on the page.
    pub numeric_tokens: usize,
    /// "index" (case-insensitive) within the leading ~100 characters.
    pub has_index_keyword: bool,
    /// Lines shaped like `<non-comma text>, <digits>`.
    pub entry_shaped_lines: usize,
    /// Exactly two horizontally disjoint text blocks.
    pub two_column: bool,
}

/// Summary of one parse invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseReport {
    /// Entries appended to the document.
    pub entries: usize,
    /// Logical lines or occurrence pieces skipped as malformed.
    pub skipped: usize,
    /// Chunk indices whose completion call or repair failed
    /// (model-assisted parse only).
    pub failed_chunks: Vec<usize>,
}
