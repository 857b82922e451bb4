//! The configured language set: which languages may author an article,
//! which languages every article must exist in, and the tie-break order
//! between source languages.

use anyhow::{bail, Result};

/// Validated language configuration shared by the detector, orchestrator and
/// completeness tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet {
    sources: Vec<String>,
    priority: Vec<String>,
    supported: Vec<String>,
}

impl LanguageSet {
    /// Build a language set.
    ///
    /// * `sources` - source-capable languages, in configured order
    /// * `targets` - languages every article should be available in
    /// * `priority` - tie-break order between sources; sources not named here
    ///   are appended in configured order
    ///
    /// The supported set is `sources ∪ targets`, sources first.
    pub fn new(sources: &[String], targets: &[String], priority: &[String]) -> Result<Self> {
        if sources.is_empty() {
            bail!("At least one source language must be configured");
        }

        let sources = dedup(sources);
        for code in &sources {
            if code.trim().is_empty() {
                bail!("Empty source language code");
            }
        }

        let mut ordered_priority = Vec::with_capacity(sources.len());
        for code in dedup(priority) {
            if !sources.contains(&code) {
                bail!(
                    "Priority order names '{}', which is not a source language",
                    code
                );
            }
            ordered_priority.push(code);
        }
        for code in &sources {
            if !ordered_priority.contains(code) {
                ordered_priority.push(code.clone());
            }
        }

        let mut supported = sources.clone();
        for code in targets {
            if code.trim().is_empty() {
                bail!("Empty target language code");
            }
            if !supported.contains(code) {
                supported.push(code.clone());
            }
        }

        Ok(Self {
            sources,
            priority: ordered_priority,
            supported,
        })
    }

    /// Source-capable languages in configured order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Tie-break order, highest priority first. Always covers every source.
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Every language an article is tracked in.
    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    pub fn is_source(&self, code: &str) -> bool {
        self.sources.iter().any(|c| c == code)
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.supported.iter().any(|c| c == code)
    }

    /// Candidate translation targets for an authoritative language.
    pub fn targets_for<'a>(&'a self, authoritative: &'a str) -> impl Iterator<Item = &'a str> {
        self.supported
            .iter()
            .map(String::as_str)
            .filter(move |code| *code != authoritative)
    }
}

fn dedup(codes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim().to_string();
        if !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_supported_is_union_sources_first() {
        let set = LanguageSet::new(&codes(&["en", "km"]), &codes(&["km", "es"]), &[]).unwrap();
        assert_eq!(set.supported(), codes(&["en", "km", "es"]).as_slice());
    }

    #[test]
    fn test_priority_defaults_to_source_order() {
        let set = LanguageSet::new(&codes(&["en", "km"]), &codes(&["es"]), &[]).unwrap();
        assert_eq!(set.priority(), codes(&["en", "km"]).as_slice());
    }

    #[test]
    fn test_priority_appends_unlisted_sources() {
        let set = LanguageSet::new(
            &codes(&["en", "km", "th"]),
            &codes(&["es"]),
            &codes(&["km"]),
        )
        .unwrap();
        assert_eq!(set.priority(), codes(&["km", "en", "th"]).as_slice());
    }

    #[test]
    fn test_priority_rejects_non_source() {
        let result = LanguageSet::new(&codes(&["en"]), &codes(&["es"]), &codes(&["es"]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a source"));
    }

    #[test]
    fn test_requires_a_source() {
        assert!(LanguageSet::new(&[], &codes(&["es"]), &[]).is_err());
    }

    #[test]
    fn test_targets_for_excludes_authoritative() {
        let set = LanguageSet::new(&codes(&["en", "km"]), &codes(&["es"]), &[]).unwrap();
        let targets: Vec<&str> = set.targets_for("en").collect();
        assert_eq!(targets, vec!["km", "es"]);
    }

    #[test]
    fn test_membership() {
        let set = LanguageSet::new(&codes(&["en", "km"]), &codes(&["es"]), &[]).unwrap();
        assert!(set.is_source("km"));
        assert!(!set.is_source("es"));
        assert!(set.is_supported("es"));
        assert!(!set.is_supported("fr"));
    }
}
