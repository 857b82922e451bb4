use crate::provider::{TranslationError, TranslationProvider};
use async_trait::async_trait;

/// Offline provider producing `[km] Hello`-style placeholder translations.
///
/// Used when no provider API key is configured, so articles still flow
/// through the pipeline and show up as complete in status reports.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderProvider;

impl PlaceholderProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn render(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }
}

#[async_trait]
impl TranslationProvider for PlaceholderProvider {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn request_translation(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        Ok(Self::render(text, target_language))
    }
}
