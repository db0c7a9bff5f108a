use crate::model::Occurrence;
use tracing::warn;

/// Parse a comma-separated occurrence list like `12, 44-45, 182-4`.
///
/// Returns the parsed occurrences and the number of malformed pieces that
/// were skipped. Skipping is per piece: one bad range never discards the
/// rest of the line.
pub fn parse_occurrences(list: &str) -> (Vec<Occurrence>, usize) {
    let mut occurrences = Vec::new();
    let mut skipped = 0;

    for piece in list.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match parse_piece(piece) {
            Some(occ) => occurrences.push(occ),
            None => {
                warn!(%piece, "skipping malformed occurrence");
                skipped += 1;
            }
        }
    }

    (occurrences, skipped)
}

/// A single page number or a dash-separated range. En dashes, em dashes and
/// tildes count as range separators.
fn parse_piece(piece: &str) -> Option<Occurrence> {
    let normalized: String = piece
        .chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' | '~' => '-',
            c => c,
        })
        .collect();
    let normalized = normalized.trim();

    match normalized.split_once('-') {
        None => normalized.parse().ok().map(Occurrence::single),
        Some((start, end)) => {
            let start_str = start.trim();
            let end_str = end.trim();
            let start: u32 = start_str.parse().ok()?;
            let end = expand_range_end(start_str, end_str)?;
            if end < start {
                return None;
            }
            Some(Occurrence::range(start, end))
        }
    }
}

/// Resolve a range end, expanding the abbreviated form by prefixing the
/// start's leading digits: `182-4` ends at 184, `182-84` at 184, while
/// `5-9` stays 9 because the end is no shorter than the start. Ends with
/// three or more digits are always taken literally.
fn expand_range_end(start: &str, end: &str) -> Option<u32> {
    if end.is_empty() || !end.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if end.len() < 3 && end.len() < start.len() {
        let prefix = &start[..start.len() - end.len()];
        format!("{prefix}{end}").parse().ok()
    } else {
        end.parse().ok()
    }
}
