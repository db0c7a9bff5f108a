pub mod layout;
pub mod offset;

use crate::error::BookdexError;
use crate::model::{IndexLocation, PageSignal};
use crate::source::{PageSource, TextMode};
use layout::is_two_column;
use offset::OffsetEstimator;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

/// Numeric-token count a page must exceed to be an index candidate.
const MIN_NUMERIC_TOKENS: usize = 10;
/// Entry-shaped line quorum for candidates with neither keyword nor
/// two-column layout.
const MIN_ENTRY_SHAPED_LINES: usize = 10;
/// How far into a page the "index" heading is searched for.
const HEAD_CHARS: usize = 100;

static NUMERIC_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static ENTRY_SHAPED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^,]+,\s*\d+").unwrap());

/// Locate the index section and the printed-page offset in a single pass
/// over every page of the document.
///
/// An empty `index_pages` in the result is the valid "no index found"
/// outcome, not an error.
pub fn locate(source: &dyn PageSource) -> Result<IndexLocation, BookdexError> {
    let page_count = source.page_count()?;
    let mut estimator = OffsetEstimator::new();
    let mut signals: Vec<PageSignal> = Vec::with_capacity(page_count);

    for page in 1..=page_count {
        let text = source.page_text(page, TextMode::Plain)?;
        estimator.observe(page, &text);
        signals.push(page_signal(source, page, &text)?);
    }

    let (page_offset, offset_degraded) = estimator.resolve();
    if offset_degraded {
        warn!("no printed page numbers detected anywhere; offset defaulted to 0");
    } else {
        info!(
            offset = page_offset,
            samples = estimator.sample_count(),
            "printed-page offset resolved"
        );
    }

    let accepted: Vec<usize> = signals
        .iter()
        .filter(|s| is_candidate(s))
        .map(|s| s.page)
        .collect();
    let run = longest_consecutive_run(&accepted);
    let index_pages = trim_to_index_heading(run, &signals);

    if index_pages.is_empty() {
        info!("no index section found");
    } else {
        info!(
            first = index_pages[0],
            last = index_pages[index_pages.len() - 1],
            "index section located"
        );
    }

    Ok(IndexLocation {
        index_pages,
        page_offset,
        offset_degraded,
    })
}

fn page_signal(
    source: &dyn PageSource,
    page: usize,
    text: &str,
) -> Result<PageSignal, BookdexError> {
    let numeric_tokens = NUMERIC_TOKEN_RE.find_iter(text).count();
    let has_index_keyword = head_mentions_index(text);
    let entry_shaped_lines = text
        .lines()
        .filter(|l| ENTRY_SHAPED_RE.is_match(l.trim()))
        .count();

    // Layout geometry is fetched only when the cheaper text signals have
    // not already settled the page.
    let two_column = if numeric_tokens > MIN_NUMERIC_TOKENS && !has_index_keyword {
        is_two_column(&source.layout_boxes(page)?)
    } else {
        false
    };

    Ok(PageSignal {
        page,
        numeric_tokens,
        has_index_keyword,
        entry_shaped_lines,
        two_column,
    })
}

/// "index" (case-insensitive) within the leading characters of the page.
fn head_mentions_index(text: &str) -> bool {
    let head: String = text.chars().take(HEAD_CHARS).collect();
    head.to_lowercase().contains("index")
}

/// Candidate test: index pages are numerically dense, and carry either the
/// heading keyword, a two-column layout, or a quorum of term-then-page
/// shaped lines.
fn is_candidate(signal: &PageSignal) -> bool {
    if signal.numeric_tokens <= MIN_NUMERIC_TOKENS {
        return false;
    }
    signal.has_index_keyword
        || signal.two_column
        || signal.entry_shaped_lines >= MIN_ENTRY_SHAPED_LINES
}

/// Longest run of strictly consecutive page numbers; the first run wins
/// ties. Input must be sorted ascending, which the scan order guarantees.
pub fn longest_consecutive_run(pages: &[usize]) -> Vec<usize> {
    let mut best: &[usize] = &[];
    let mut start = 0;

    for i in 0..pages.len() {
        let run_breaks = i + 1 == pages.len() || pages[i + 1] != pages[i] + 1;
        if run_breaks {
            let run = &pages[start..=i];
            if run.len() > best.len() {
                best = run;
            }
            start = i + 1;
        }
    }

    best.to_vec()
}

/// Drop pages off the front of the run until it starts at a page whose head
/// mentions "index". An exhausted run means no index was found.
fn trim_to_index_heading(mut run: Vec<usize>, signals: &[PageSignal]) -> Vec<usize> {
    while let Some(&first) = run.first() {
        let anchored = signals
            .iter()
            .find(|s| s.page == first)
            .map(|s| s.has_index_keyword)
            .unwrap_or(false);
        if anchored {
            break;
        }
        run.remove(0);
    }
    run
}
