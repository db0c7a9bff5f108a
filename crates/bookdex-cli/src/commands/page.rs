use bookdex_core::source::pdftotext::PdftotextSource;
use bookdex_core::Document;
use std::path::PathBuf;

pub fn run(input_file: PathBuf, printed_page: u32) -> Result<(), bookdex_core::BookdexError> {
    let source = PdftotextSource::open(input_file)?;
    let mut doc = Document::open(Box::new(source));

    // The offset comes out of the locate pass; without it a printed page
    // number cannot be resolved to a physical one.
    doc.locate_index()?;

    let text = doc.page_text(printed_page)?;
    println!("{text}");
    Ok(())
}
