//! Language catalog: metadata for every language the service knows how to
//! name in a translation prompt.
//!
//! Which languages are actually *in use* is decided by configuration (see
//! [`crate::i18n::LanguageSet`]); this catalog only answers "what is `km`
//! called?". It is initialised once with `OnceLock` and immutable afterwards.

use std::sync::OnceLock;

/// Metadata for a known language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "km")
    pub code: &'static str,

    /// English name of the language (e.g., "Khmer")
    pub name: &'static str,

    /// Native name of the language (e.g., "ខ្មែរ")
    pub native_name: &'static str,
}

/// Global language catalog.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language catalog, initialising it on first use.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: known_languages(),
        })
    }

    /// Look up a language by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// English name for a code, if the language is known.
    pub fn name_of(&self, code: &str) -> Option<&'static str> {
        self.get_by_code(code).map(|lang| lang.name)
    }

    /// Check whether a code is in the catalog.
    pub fn is_known(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    /// All catalogued languages.
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }
}

fn known_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
        },
        LanguageConfig {
            code: "km",
            name: "Khmer",
            native_name: "ខ្មែរ",
        },
        LanguageConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
        },
        LanguageConfig {
            code: "zh",
            name: "Chinese",
            native_name: "中文",
        },
        LanguageConfig {
            code: "th",
            name: "Thai",
            native_name: "ไทย",
        },
        LanguageConfig {
            code: "vi",
            name: "Vietnamese",
            native_name: "Tiếng Việt",
        },
        LanguageConfig {
            code: "lo",
            name: "Lao",
            native_name: "ລາວ",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_khmer() {
        let khmer = LanguageRegistry::get()
            .get_by_code("km")
            .expect("Khmer should be catalogued");
        assert_eq!(khmer.name, "Khmer");
        assert_eq!(khmer.native_name, "ខ្មែរ");
    }

    #[test]
    fn test_get_by_code_unknown() {
        assert!(LanguageRegistry::get().get_by_code("xx").is_none());
        assert!(LanguageRegistry::get().get_by_code("").is_none());
    }

    #[test]
    fn test_name_of() {
        assert_eq!(LanguageRegistry::get().name_of("es"), Some("Spanish"));
        assert_eq!(LanguageRegistry::get().name_of("xx"), None);
    }

    #[test]
    fn test_codes_are_unique() {
        let all = LanguageRegistry::get().list_all();
        let codes: std::collections::HashSet<_> = all.iter().map(|l| l.code).collect();
        assert_eq!(codes.len(), all.len());
    }
}
