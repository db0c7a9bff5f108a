#[derive(Debug, thiserror::Error)]
pub enum BookdexError {
    #[error("document read failed: {0}")]
    Source(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("GEMINI_API_KEY is not set; the model-assisted parser requires it")]
    MissingApiKey,

    #[error("completion request failed: {0}")]
    Completion(String),

    #[error("completion output unusable after repair: {0}")]
    MalformedOutput(String),

    #[error("index location has not been computed yet; run locate_index first")]
    NotLocated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
