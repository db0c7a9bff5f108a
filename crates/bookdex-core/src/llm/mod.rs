pub mod client;
pub mod limiter;
pub mod repair;

use crate::error::BookdexError;
use crate::model::{IndexEntry, Occurrence};
use client::CompletionClient;
use limiter::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Lines per chunk submitted to the completion service.
pub const CHUNK_LINES: usize = 120;
/// Completion calls allowed in flight at once.
pub const MAX_IN_FLIGHT: usize = 10;
/// Call starts admitted per rate window.
pub const MAX_CALLS_PER_WINDOW: usize = 15;
/// Length of the rolling rate window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

const PROMPT_HEADER: &str = r#"You are given text from the index pages of a document after OCR.
The index may have a hierarchical structure where parent terms are followed
by subtopics. Parent terms are identified by a colon (`:`) at the end of the
line. Subtopics are listed below the parent term and are associated with
page numbers or ranges.

Output the list of terms and their occurrences in JSON format. Use a list of
lists for occurrences: a page range or single page is `[start, end]`, and
multiple occurrences are a single array of arrays such as
`[[start1, end1], [start2, end2]]`.

The JSON structure should look like this:
[
    {"t": "parent_term1", "o": [[start1, end1], [start2, end2]]},
    {"t": "subtopic under parent_term1", "o": [[start1, end1]]},
    ...
]

Rules:
1. If a page range includes only one page, represent it as [start, start].
2. Subtopics should be prefixed with "under [parent term]".
3. Each occurrence of a page or page range must remain distinct and must
   not be merged.
4. Avoid newlines or extra whitespace between elements inside the
   occurrences list.
5. Ensure there is only one parent term for each hierarchy; avoid nested
   parent terms.
6. Ignore the input if it does not resemble an index page.
7. The text may contain OCR errors, such as words merged together or
   s p a c e d incorrectly. Correct these where the intent is clear.

The input text is:
"#;

/// Caller-owned admission control for completion dispatch: a counting gate
/// for in-flight calls plus the sliding-window rate limiter.
///
/// Constructed by the caller and passed in, so documents processed
/// concurrently only share limits when handed the same instance.
pub struct DispatchLimits {
    in_flight: Semaphore,
    rate: RateLimiter,
}

impl DispatchLimits {
    pub fn new(max_in_flight: usize, max_calls: usize, window: Duration) -> DispatchLimits {
        DispatchLimits {
            in_flight: Semaphore::new(max_in_flight),
            rate: RateLimiter::new(max_calls, window),
        }
    }
}

impl Default for DispatchLimits {
    fn default() -> DispatchLimits {
        DispatchLimits::new(MAX_IN_FLIGHT, MAX_CALLS_PER_WINDOW, RATE_WINDOW)
    }
}

/// Per-chunk result: parsed entries, or the failure that voided the chunk.
/// A failure never aborts the rest of the batch.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub chunk: usize,
    pub result: Result<Vec<IndexEntry>, BookdexError>,
}

/// Outcome of the model-assisted strategy.
#[derive(Debug, Default)]
pub struct AssistedParse {
    pub entries: Vec<IndexEntry>,
    pub failed_chunks: Vec<usize>,
}

/// Parse index text by dispatching fixed-size line chunks to the completion
/// service.
///
/// Calls run concurrently under `limits`, but results are reconciled in
/// chunk order, so the output sequence is deterministic for a deterministic
/// service regardless of completion order.
pub async fn parse_index_text<C>(
    text: &str,
    client: Arc<C>,
    limits: Arc<DispatchLimits>,
) -> AssistedParse
where
    C: CompletionClient + 'static,
{
    let chunks = chunk_lines(text, CHUNK_LINES);
    info!(chunks = chunks.len(), "dispatching index text to completion service");

    let mut handles = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.into_iter().enumerate() {
        let client = Arc::clone(&client);
        let limits = Arc::clone(&limits);
        handles.push(tokio::spawn(async move {
            ChunkOutcome {
                chunk: index,
                result: complete_chunk(&chunk, client.as_ref(), &limits).await,
            }
        }));
    }

    let mut parse = AssistedParse::default();
    for (index, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(chunk = index, error = %e, "chunk task aborted");
                parse.failed_chunks.push(index);
                continue;
            }
        };
        match outcome.result {
            Ok(entries) => parse.entries.extend(entries),
            Err(e) => {
                warn!(chunk = outcome.chunk, error = %e, "chunk dropped");
                parse.failed_chunks.push(outcome.chunk);
            }
        }
    }

    parse
}

/// Split text into fixed-size groups of consecutive lines. A chunk boundary
/// may split a logical entry; that loss is accepted.
pub fn chunk_lines(text: &str, lines_per_chunk: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    lines
        .chunks(lines_per_chunk.max(1))
        .map(|chunk| chunk.join("\n"))
        .collect()
}

async fn complete_chunk(
    chunk: &str,
    client: &dyn CompletionClient,
    limits: &DispatchLimits,
) -> Result<Vec<IndexEntry>, BookdexError> {
    let _permit = limits
        .in_flight
        .acquire()
        .await
        .map_err(|_| BookdexError::Completion("dispatch gate closed".into()))?;
    limits.rate.acquire().await;

    let reply = client.complete(&build_prompt(chunk)).await?;
    entries_from_reply(&reply)
}

fn build_prompt(chunk: &str) -> String {
    // Quotation marks in the OCR text tend to leak into the JSON output.
    let sanitized = chunk.replace('"', "");
    format!("{PROMPT_HEADER}{sanitized}")
}

fn entries_from_reply(reply: &str) -> Result<Vec<IndexEntry>, BookdexError> {
    let body = repair::strip_code_fences(reply);
    let value = repair::parse_lenient(body)
        .map_err(|e| BookdexError::MalformedOutput(e.to_string()))?;
    entries_from_json(&value)
}

fn entries_from_json(value: &serde_json::Value) -> Result<Vec<IndexEntry>, BookdexError> {
    let items = value
        .as_array()
        .ok_or_else(|| BookdexError::MalformedOutput("top level is not a list".into()))?;

    let mut entries = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let term = obj
            .get("t")
            .or_else(|| obj.get("term"))
            .and_then(|t| t.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if term.is_empty() {
            continue;
        }

        let occurrences: Vec<Occurrence> = obj
            .get("o")
            .or_else(|| obj.get("occurrences"))
            .and_then(|o| o.as_array())
            .map(|list| list.iter().filter_map(occurrence_from_json).collect())
            .unwrap_or_default();
        if occurrences.is_empty() {
            continue;
        }

        entries.push(IndexEntry::new(term, occurrences));
    }

    Ok(entries)
}

/// Normalize the service's occurrence shapes into ranges. Across prompt
/// variants the same data arrives as `[start, end]` pairs, bare integers,
/// or `{"s": ..., "e": ...}` / `{"start": ..., "end": ...}` objects.
fn occurrence_from_json(value: &serde_json::Value) -> Option<Occurrence> {
    if let Some(page) = page_from(value) {
        return Some(Occurrence::single(page));
    }
    if let Some(pair) = value.as_array() {
        return match pair.as_slice() {
            [only] => Some(Occurrence::single(page_from(only)?)),
            [start, end] => {
                let start = page_from(start)?;
                let end = page_from(end)?;
                Some(Occurrence::range(start.min(end), start.max(end)))
            }
            _ => None,
        };
    }
    if let Some(obj) = value.as_object() {
        let start = obj.get("s").or_else(|| obj.get("start")).and_then(page_from)?;
        let end = obj
            .get("e")
            .or_else(|| obj.get("end"))
            .and_then(page_from)
            .unwrap_or(start);
        return Some(Occurrence::range(start.min(end), start.max(end)));
    }
    None
}

fn page_from(value: &serde_json::Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_counts() {
        let text = (0..250).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let chunks = chunk_lines(&text, 120);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].lines().count(), 120);
        assert_eq!(chunks[2].lines().count(), 10);
    }

    #[test]
    fn test_chunking_short_text_single_chunk() {
        assert_eq!(chunk_lines("a\nb", 120).len(), 1);
    }

    #[test]
    fn test_entries_from_pair_shape() {
        let entries = entries_from_reply(
            r#"[{"t": "Cats", "o": [[1, 1], [3, 4]]}, {"t": "Dogs", "o": [[7, 7]]}]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].term, "Cats");
        assert_eq!(
            entries[0].occurrences,
            vec![Occurrence::single(1), Occurrence::range(3, 4)]
        );
    }

    #[test]
    fn test_entries_from_object_shape() {
        let entries = entries_from_reply(
            r#"[{"t": "Cats", "o": [{"s": 3, "e": 4}, {"start": 9, "end": 9}]}]"#,
        )
        .unwrap();
        assert_eq!(
            entries[0].occurrences,
            vec![Occurrence::range(3, 4), Occurrence::single(9)]
        );
    }

    #[test]
    fn test_entries_from_bare_integers() {
        let entries = entries_from_reply(r#"[{"t": "Cats", "o": [3, 7]}]"#).unwrap();
        assert_eq!(
            entries[0].occurrences,
            vec![Occurrence::single(3), Occurrence::single(7)]
        );
    }

    #[test]
    fn test_fenced_reply_with_trailing_comma() {
        let entries =
            entries_from_reply("```json\n[{\"t\": \"Cats\", \"o\": [[1, 2],]}]\n```").unwrap();
        assert_eq!(entries[0].occurrences, vec![Occurrence::range(1, 2)]);
    }

    #[test]
    fn test_hierarchical_terms_stay_flat() {
        let entries = entries_from_reply(
            r#"[{"t": "habitats under Cats", "o": [[12, 12]]}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].term, "habitats under Cats");
    }

    #[test]
    fn test_reversed_pair_normalized() {
        let entries = entries_from_reply(r#"[{"t": "Cats", "o": [[4, 3]]}]"#).unwrap();
        assert_eq!(entries[0].occurrences, vec![Occurrence::range(3, 4)]);
    }

    #[test]
    fn test_unusable_reply_is_error() {
        assert!(matches!(
            entries_from_reply("I could not find an index."),
            Err(BookdexError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_non_list_top_level_is_error() {
        assert!(matches!(
            entries_from_reply(r#"{"t": "Cats"}"#),
            Err(BookdexError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_entry_without_occurrences_dropped() {
        let entries = entries_from_reply(r#"[{"t": "Cats", "o": []}]"#).unwrap();
        assert!(entries.is_empty());
    }
}
