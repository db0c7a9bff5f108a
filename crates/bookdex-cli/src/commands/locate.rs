use bookdex_core::source::pdftotext::PdftotextSource;
use bookdex_core::Document;
use std::path::PathBuf;

pub fn run(input_file: PathBuf) -> Result<(), bookdex_core::BookdexError> {
    let source = PdftotextSource::open(input_file)?;
    let mut doc = Document::open(Box::new(source));
    let location = doc.locate_index()?;

    if location.found_index() {
        let pages: Vec<String> = location.index_pages.iter().map(|p| p.to_string()).collect();
        println!("Index pages: {}", pages.join(", "));
    } else {
        println!("No index found.");
    }

    if location.offset_degraded {
        println!("Page offset: 0 (no printed page numbers seen; low confidence)");
    } else {
        println!("Page offset: {}", location.page_offset);
    }

    Ok(())
}
