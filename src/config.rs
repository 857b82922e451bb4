use crate::completeness::CompletenessTracker;
use crate::detector::ChangeDetector;
use crate::i18n::{LanguageRegistry, LanguageSet};
use crate::orchestrator::OrchestratorSettings;
use crate::provider::DEFAULT_OPENAI_API_URL;
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    // Languages
    pub source_languages: Vec<String>,
    pub target_languages: Vec<String>,
    pub source_language_priority: Vec<String>,

    // Document shape
    pub translatable_fields: Vec<String>,
    pub required_fields: Vec<String>,

    // Translation calls
    pub max_concurrent_translation_calls: usize,
    pub translation_retry_max: u32,
    pub translation_retry_initial_delay_ms: u64,
    pub translation_timeout_ms: u64,

    // OpenAI (absent key selects the placeholder provider)
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,

    // Server / storage
    pub database_url: Option<String>,
    pub api_key: Option<String>,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_languages: list("en,km"),
            target_languages: list("en,km,es"),
            source_language_priority: Vec::new(),
            translatable_fields: list("title,excerpt,body"),
            required_fields: list("title"),
            max_concurrent_translation_calls: 6,
            translation_retry_max: 2,
            translation_retry_initial_delay_ms: 500,
            translation_timeout_ms: 10_000,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: DEFAULT_OPENAI_API_URL.to_string(),
            database_url: None,
            api_key: None,
            port: 8080,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and empty values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let source_languages = get("SUPPORTED_SOURCE_LANGUAGES")
            .map(|v| list(&v))
            .unwrap_or(defaults.source_languages);

        Ok(Self {
            target_languages: get("SUPPORTED_TARGET_LANGUAGES")
                .map(|v| list(&v))
                .unwrap_or(defaults.target_languages),
            source_language_priority: get("SOURCE_LANGUAGE_PRIORITY")
                .map(|v| list(&v))
                .unwrap_or_else(|| source_languages.clone()),
            source_languages,

            translatable_fields: get("TRANSLATABLE_FIELDS")
                .map(|v| list(&v))
                .unwrap_or(defaults.translatable_fields),
            required_fields: get("REQUIRED_FIELDS")
                .map(|v| list(&v))
                .unwrap_or(defaults.required_fields),

            max_concurrent_translation_calls: parse_or(
                get("MAX_CONCURRENT_TRANSLATION_CALLS"),
                "MAX_CONCURRENT_TRANSLATION_CALLS",
                defaults.max_concurrent_translation_calls,
            )?,
            translation_retry_max: parse_or(
                get("TRANSLATION_RETRY_MAX"),
                "TRANSLATION_RETRY_MAX",
                defaults.translation_retry_max,
            )?,
            translation_retry_initial_delay_ms: parse_or(
                get("TRANSLATION_RETRY_INITIAL_DELAY_MS"),
                "TRANSLATION_RETRY_INITIAL_DELAY_MS",
                defaults.translation_retry_initial_delay_ms,
            )?,
            translation_timeout_ms: parse_or(
                get("TRANSLATION_TIMEOUT_MS"),
                "TRANSLATION_TIMEOUT_MS",
                defaults.translation_timeout_ms,
            )?,

            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_api_url: get("OPENAI_API_URL").unwrap_or(defaults.openai_api_url),

            database_url: get("DATABASE_URL"),
            api_key: get("API_KEY"),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let languages = self.language_set()?;
        for code in languages.supported() {
            if !LanguageRegistry::get().is_known(code) {
                warn!(
                    "Language '{}' is not in the language catalog; the OpenAI provider will reject it",
                    code
                );
            }
        }

        if self.translatable_fields.is_empty() {
            bail!("TRANSLATABLE_FIELDS must name at least one field");
        }
        for field in &self.required_fields {
            if !self.translatable_fields.contains(field) {
                bail!(
                    "Required field '{}' is not one of TRANSLATABLE_FIELDS {:?}",
                    field,
                    self.translatable_fields
                );
            }
        }
        if self.max_concurrent_translation_calls == 0 {
            bail!("MAX_CONCURRENT_TRANSLATION_CALLS must be at least 1");
        }
        if self.translation_timeout_ms == 0 {
            bail!("TRANSLATION_TIMEOUT_MS must be greater than 0");
        }
        Ok(())
    }

    pub fn language_set(&self) -> Result<LanguageSet> {
        LanguageSet::new(
            &self.source_languages,
            &self.target_languages,
            &self.source_language_priority,
        )
        .context("Invalid language configuration")
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings::new(
            self.max_concurrent_translation_calls,
            self.translation_retry_max,
            Duration::from_millis(self.translation_retry_initial_delay_ms),
            Duration::from_millis(self.translation_timeout_ms),
        )
    }

    pub fn detector(&self) -> Result<ChangeDetector> {
        Ok(ChangeDetector::new(
            self.language_set()?,
            self.translatable_fields.clone(),
            self.required_fields.clone(),
        ))
    }

    pub fn tracker(&self) -> Result<CompletenessTracker> {
        Ok(CompletenessTracker::new(
            self.language_set()?.supported().to_vec(),
            self.translatable_fields.clone(),
        ))
    }
}

/// Split a comma-separated list, trimming entries and dropping blanks.
fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}
