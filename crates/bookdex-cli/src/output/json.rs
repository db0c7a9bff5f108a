use bookdex_core::{BookdexError, IndexEntry};

pub fn print(entries: &[IndexEntry]) -> Result<(), BookdexError> {
    let json = serde_json::to_string_pretty(entries)?;
    println!("{json}");
    Ok(())
}
