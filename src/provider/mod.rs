//! Machine translation providers.
//!
//! The orchestrator only sees the [`TranslationProvider`] trait; concrete
//! providers are constructed at startup and injected, so tests substitute
//! their own.

mod openai;
mod placeholder;

pub use openai::{OpenAiProvider, DEFAULT_OPENAI_API_URL};
pub use placeholder::PlaceholderProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Typed provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// Network or service failure, including timeouts. Retryable.
    #[error("translation provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider throttled us. Retryable with backoff.
    #[error("translation provider rate limited: {0}")]
    RateLimited(String),

    /// The provider cannot translate into this language. Not retryable.
    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),

    /// The provider answered with something unusable. Retried once.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider refused the request (auth, bad request). Not retryable.
    #[error("translation request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl TranslationError {
    /// How many retries this failure deserves, given the configured maximum.
    pub fn retry_budget(&self, configured_max: u32) -> u32 {
        match self {
            TranslationError::ProviderUnavailable(_) | TranslationError::RateLimited(_) => {
                configured_max
            }
            TranslationError::MalformedResponse(_) => configured_max.min(1),
            TranslationError::UnsupportedLanguage(_) | TranslationError::Rejected { .. } => 0,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_budget(u32::MAX) > 0
    }
}

/// Capability wrapping an external machine translation service.
///
/// Implementations provide [`request_translation`](Self::request_translation);
/// callers use [`translate`](Self::translate), which never contacts the
/// service for blank input and rejects blank output for non-blank input.
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Translate non-blank `text` into `target_language`.
    async fn request_translation(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationError>;

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let translated = self.request_translation(text, target_language).await?;
        if translated.trim().is_empty() {
            return Err(TranslationError::MalformedResponse(format!(
                "empty translation into '{}' for non-empty input",
                target_language
            )));
        }
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoProvider {
        calls: AtomicU32,
        reply: String,
    }

    #[async_trait]
    impl TranslationProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn request_translation(
            &self,
            _text: &str,
            _target_language: &str,
        ) -> Result<String, TranslationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_blank_input_skips_provider() {
        let provider = EchoProvider {
            calls: AtomicU32::new(0),
            reply: "x".to_string(),
        };
        assert_eq!(provider.translate("  \n", "km").await.unwrap(), "");
        assert_eq!(provider.translate("", "km").await.unwrap(), "");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_output_is_malformed() {
        let provider = EchoProvider {
            calls: AtomicU32::new(0),
            reply: " ".to_string(),
        };
        let err = provider.translate("Hello", "km").await.unwrap_err();
        assert!(matches!(err, TranslationError::MalformedResponse(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_budgets() {
        assert_eq!(
            TranslationError::ProviderUnavailable("down".into()).retry_budget(2),
            2
        );
        assert_eq!(TranslationError::RateLimited("429".into()).retry_budget(3), 3);
        assert_eq!(TranslationError::MalformedResponse("?".into()).retry_budget(2), 1);
        assert_eq!(TranslationError::MalformedResponse("?".into()).retry_budget(0), 0);
        assert_eq!(TranslationError::UnsupportedLanguage("xx".into()).retry_budget(2), 0);
        assert_eq!(
            TranslationError::Rejected {
                status: 401,
                message: "bad key".into()
            }
            .retry_budget(2),
            0
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(TranslationError::ProviderUnavailable("x".into()).is_retryable());
        assert!(TranslationError::MalformedResponse("x".into()).is_retryable());
        assert!(!TranslationError::UnsupportedLanguage("xx".into()).is_retryable());
    }
}
