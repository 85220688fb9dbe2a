use async_trait::async_trait;

use crate::Result;

/// Language-generation backend (OpenRouter today).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a single user prompt and return the assistant text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Image search backend (Unsplash today).
///
/// `Ok(None)` means the search worked but produced nothing usable.
#[async_trait]
pub trait ImageLookup: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Option<String>>;
}
