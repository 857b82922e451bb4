use crate::i18n::LanguageRegistry;
use crate::provider::{TranslationError, TranslationProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

fn build_translation_system_prompt(target_language: &str) -> String {
    format!(
        r#"You are a professional translator for an agricultural knowledge base read by farmers, buyers and extension workers. Translate the text you are given into {}.

## Translation Rules

### DO NOT translate:
- URLs and links
- Numbers, measurements and units (e.g., 25 kg/ha, 3 days)
- Scientific names of crops, pests and diseases
- Brand and product names

### DO translate:
- Headings, lists and body text
- Common crop, livestock and farming terms, using the words farmers use

### Formatting:
- Preserve all markdown formatting (bold, italic, headers, bullet points, links)
- Keep the same structure and paragraph breaks as the original

### Output:
- Reply with the translation only, no preamble or notes"#,
        target_language
    )
}

fn build_translation_user_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {}:\n\n{}",
        target_language, text
    )
}

/// Provider backed by an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_completion_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, api_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_completion_tokens: 4000,
        }
    }

    fn build_request(&self, text: &str, language_name: &str) -> TranslationRequest {
        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);
        TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_translation_system_prompt(language_name),
                },
                Message {
                    role: "user".to_string(),
                    content: build_translation_user_prompt(text, language_name),
                },
            ],
            max_completion_tokens: if is_reasoning {
                16000
            } else {
                self.max_completion_tokens
            },
            temperature: if is_reasoning { None } else { Some(0.2) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        }
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn request_translation(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        let language_name = LanguageRegistry::get()
            .name_of(target_language)
            .ok_or_else(|| TranslationError::UnsupportedLanguage(target_language.to_string()))?;

        let request = self.build_request(text, language_name);
        debug!(
            "Requesting {} translation of {} chars from {}",
            language_name,
            text.chars().count(),
            self.model
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                TranslationError::ProviderUnavailable(format!(
                    "failed to send translation request: {}",
                    e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(classify_status(status.as_u16(), body));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            TranslationError::MalformedResponse(format!(
                "failed to parse translation response: {}",
                e
            ))
        })?;

        let translated = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                TranslationError::MalformedResponse(
                    "translation response contained no choices".to_string(),
                )
            })?;

        Ok(translated)
    }
}

/// 429 is throttling, 5xx is an outage; any other 4xx is our fault and
/// retrying it would not help.
fn classify_status(status: u16, body: String) -> TranslationError {
    match status {
        429 => TranslationError::RateLimited(body),
        500..=599 => TranslationError::ProviderUnavailable(format!("HTTP {}: {}", status, body)),
        _ => TranslationError::Rejected {
            status,
            message: body,
        },
    }
}
