use bookdex_core::{IndexEntry, IndexLocation};

pub fn print(entries: &[IndexEntry], location: &IndexLocation) {
    match location.index_pages.as_slice() {
        [] => println!("=== Index ({} entries) ===\n", entries.len()),
        [only] => println!(
            "=== Index ({} entries, physical page {}) ===\n",
            entries.len(),
            only
        ),
        [first, .., last] => println!(
            "=== Index ({} entries, physical pages {}-{}) ===\n",
            entries.len(),
            first,
            last
        ),
    }

    let max_term = entries.iter().map(|e| e.term.len()).max().unwrap_or(0);
    for entry in entries {
        let occurrences: Vec<String> = entry.occurrences.iter().map(|o| o.to_string()).collect();
        println!(
            "  {:<width$}  {}",
            entry.term,
            occurrences.join(", "),
            width = max_term
        );
    }

    if location.offset_degraded {
        println!("\n(printed page numbers were never detected; offset defaulted to 0)");
    }
}
