pub mod pages;

use crate::model::IndexEntry;
use once_cell::sync::Lazy;
use pages::parse_occurrences;
use regex::Regex;

/// `<term>, <comma/range-separated numerals>` over one merged logical line.
/// The lazy term group lets embedded commas stay in the term as long as the
/// tail is purely numeric listing.
static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?),\s*([\d,\s\-\u{2013}\u{2014}~]+)$").unwrap());

/// Outcome of the deterministic strategy over concatenated index text.
#[derive(Debug, Default)]
pub struct ParsedIndex {
    pub entries: Vec<IndexEntry>,
    /// Malformed occurrence pieces skipped with a warning.
    pub skipped: usize,
}

/// Deterministic parser: merge wrapped lines, then extract
/// `term, occurrences` entries in document order.
///
/// Lines that never match the entry shape (headings, stray page headers)
/// are ignored; only malformed pieces inside a matched entry count as
/// skipped.
pub fn parse_index_text(text: &str) -> ParsedIndex {
    let mut parsed = ParsedIndex::default();

    for line in merge_continuation_lines(text) {
        let Some(caps) = ENTRY_RE.captures(&line) else {
            continue;
        };
        let term = caps[1].trim().to_string();
        if term.is_empty() {
            continue;
        }

        let (occurrences, skipped) = parse_occurrences(&caps[2]);
        parsed.skipped += skipped;
        if occurrences.is_empty() {
            continue;
        }
        parsed.entries.push(IndexEntry::new(term, occurrences));
    }

    parsed
}

/// Merge source lines into logical entries: a line starting with a digit
/// continues the previous line's page-number listing; any other non-empty
/// line starts a new logical line, flushing the previous one.
fn merge_continuation_lines(text: &str) -> Vec<String> {
    let mut merged = Vec::new();
    let mut buffer = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(line);
        } else {
            if !buffer.is_empty() {
                merged.push(std::mem::take(&mut buffer));
            }
            buffer.push_str(line);
        }
    }
    if !buffer.is_empty() {
        merged.push(buffer);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Occurrence;

    #[test]
    fn test_basic_entries() {
        let parsed = parse_index_text("14\nCats, 1, 3-4\nDogs, 7");
        assert_eq!(
            parsed.entries,
            vec![
                IndexEntry::new(
                    "Cats",
                    vec![Occurrence::single(1), Occurrence::range(3, 4)]
                ),
                IndexEntry::new("Dogs", vec![Occurrence::single(7)]),
            ]
        );
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_continuation_lines_merged() {
        let parsed = parse_index_text("Evolution, 12,\n15-17, 220\nFinches, 30");
        assert_eq!(
            parsed.entries,
            vec![
                IndexEntry::new(
                    "Evolution",
                    vec![
                        Occurrence::single(12),
                        Occurrence::range(15, 17),
                        Occurrence::single(220),
                    ]
                ),
                IndexEntry::new("Finches", vec![Occurrence::single(30)]),
            ]
        );
    }

    #[test]
    fn test_term_with_embedded_comma() {
        let parsed = parse_index_text("Darwin, Charles, 22, 31-3");
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].term, "Darwin, Charles");
        assert_eq!(
            parsed.entries[0].occurrences,
            vec![Occurrence::single(22), Occurrence::range(31, 33)]
        );
    }

    #[test]
    fn test_headings_ignored() {
        let parsed = parse_index_text("INDEX\nAardvarks, 3");
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].term, "Aardvarks");
    }

    #[test]
    fn test_digitless_lines_never_entries() {
        let parsed = parse_index_text("See also migration\nwinter roosts");
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn test_malformed_piece_counted_not_fatal() {
        let parsed = parse_index_text("Tides, 5, 3-4-5, 11");
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(
            parsed.entries[0].occurrences,
            vec![Occurrence::single(5), Occurrence::single(11)]
        );
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_merge_orphan_leading_number() {
        // A stray printed page number opens the text; it merges into an
        // entry-less logical line and is dropped.
        let merged = merge_continuation_lines("14\nCats, 1");
        assert_eq!(merged, vec!["14".to_string(), "Cats, 1".to_string()]);
    }
}
