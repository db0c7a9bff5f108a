use crate::error::BookdexError;
use async_trait::async_trait;
use serde_json::json;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// External text-completion capability: opaque text in, text out.
///
/// Transport failures are surfaced as-is; the caller decides what a failed
/// call costs. No retries happen at this layer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, BookdexError>;
}

/// Completion client backed by the Gemini generateContent endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Build a client from the `GEMINI_API_KEY` environment variable.
    ///
    /// A missing credential is a configuration error surfaced here, before
    /// any call is made.
    pub fn from_env() -> Result<GeminiClient, BookdexError> {
        let api_key =
            std::env::var("GEMINI_API_KEY").map_err(|_| BookdexError::MissingApiKey)?;
        Ok(GeminiClient {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> GeminiClient {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, BookdexError> {
        let url = format!(
            "{GEMINI_ENDPOINT}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BookdexError::Completion(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookdexError::Completion(format!(
                "service returned {status}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BookdexError::Completion(e.to_string()))?;

        payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| {
                BookdexError::Completion("response carried no candidate text".into())
            })
    }
}
