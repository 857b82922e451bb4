//! Completeness tracking: how much of each language a document has.
//!
//! Pure read-side computation over a document snapshot; safe to call as
//! often as a dashboard likes.

use crate::model::TranslatableDocument;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    /// Every configured field has text, none of it translated from outdated
    /// source text.
    Complete,
    /// Some fields have text, or some of it is stale.
    Partial,
    /// No field has text.
    Missing,
}

/// Per-language detail for status reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageCompleteness {
    pub status: TranslationStatus,
    pub populated_fields: Vec<String>,
    pub missing_fields: Vec<String>,
    /// Populated fields translated from source text that has since changed.
    pub stale_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessReport {
    pub document_id: String,
    pub revision: u64,
    pub last_authoritative_language: Option<String>,
    pub languages: BTreeMap<String, LanguageCompleteness>,
    pub complete: usize,
    pub partial: usize,
    pub missing: usize,
    /// `(complete + 0.5 × partial) / languages`, in 0.0..=1.0
    pub completion_rate: f64,
}

#[derive(Debug, Clone)]
pub struct CompletenessTracker {
    languages: Vec<String>,
    fields: Vec<String>,
}

impl CompletenessTracker {
    pub fn new(languages: Vec<String>, fields: Vec<String>) -> Self {
        Self { languages, fields }
    }

    /// Status of every tracked language.
    pub fn summarize(&self, doc: &TranslatableDocument) -> BTreeMap<String, TranslationStatus> {
        self.languages
            .iter()
            .map(|language| (language.clone(), self.language_detail(doc, language).status))
            .collect()
    }

    /// Full report with per-field detail and the aggregate rate.
    pub fn report(&self, doc: &TranslatableDocument) -> CompletenessReport {
        let languages: BTreeMap<String, LanguageCompleteness> = self
            .languages
            .iter()
            .map(|language| (language.clone(), self.language_detail(doc, language)))
            .collect();

        let count = |status: TranslationStatus| {
            languages
                .values()
                .filter(|detail| detail.status == status)
                .count()
        };
        let complete = count(TranslationStatus::Complete);
        let partial = count(TranslationStatus::Partial);
        let missing = count(TranslationStatus::Missing);

        CompletenessReport {
            document_id: doc.id.clone(),
            revision: doc.revision,
            last_authoritative_language: doc.last_authoritative_language.clone(),
            completion_rate: completion_rate(complete, partial, languages.len()),
            languages,
            complete,
            partial,
            missing,
        }
    }

    fn language_detail(&self, doc: &TranslatableDocument, language: &str) -> LanguageCompleteness {
        let (populated_fields, missing_fields): (Vec<String>, Vec<String>) = self
            .fields
            .iter()
            .cloned()
            .partition(|field| doc.language_values.text(language, field).is_some());

        let stale_fields: Vec<String> = populated_fields
            .iter()
            .filter(|field| doc.is_stale(language, field))
            .cloned()
            .collect();

        let status = if missing_fields.is_empty() && stale_fields.is_empty() {
            TranslationStatus::Complete
        } else if populated_fields.is_empty() {
            TranslationStatus::Missing
        } else {
            TranslationStatus::Partial
        };

        LanguageCompleteness {
            status,
            populated_fields,
            missing_fields,
            stale_fields,
        }
    }
}

/// Aggregate completion rate; partial languages count half.
pub fn completion_rate(complete: usize, partial: usize, total_languages: usize) -> f64 {
    if total_languages == 0 {
        return 0.0;
    }
    (complete as f64 + 0.5 * partial as f64) / total_languages as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LanguageValues, SourceStamp};
    use proptest::prelude::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tracker() -> CompletenessTracker {
        CompletenessTracker::new(names(&["en", "km", "es"]), names(&["title", "body"]))
    }

    #[test]
    fn test_summarize_mixed_statuses() {
        let doc = TranslatableDocument::new(
            "a1",
            LanguageValues::new()
                .with("en", "title", "Hello")
                .with("en", "body", "World")
                .with("km", "title", "សួស្តី"),
            3,
        );

        let summary = tracker().summarize(&doc);
        assert_eq!(summary["en"], TranslationStatus::Complete);
        assert_eq!(summary["km"], TranslationStatus::Partial);
        assert_eq!(summary["es"], TranslationStatus::Missing);
    }

    #[test]
    fn test_report_counts_and_rate() {
        let doc = TranslatableDocument::new(
            "a1",
            LanguageValues::new()
                .with("en", "title", "Hello")
                .with("en", "body", "World")
                .with("km", "title", "សួស្តី"),
            3,
        );

        let report = tracker().report(&doc);
        assert_eq!(report.complete, 1);
        assert_eq!(report.partial, 1);
        assert_eq!(report.missing, 1);
        assert!((report.completion_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(report.languages["km"].missing_fields, names(&["body"]));
        assert_eq!(report.revision, 3);
    }

    #[test]
    fn test_stale_translation_is_not_complete() {
        let mut doc = TranslatableDocument::new(
            "a1",
            LanguageValues::new()
                .with("en", "title", "Hello again")
                .with("en", "body", "World")
                .with("km", "title", "[km] Hello")
                .with("km", "body", "[km] World")
                .with("es", "title", "Hola")
                .with("es", "body", "Mundo"),
            5,
        );
        let km = doc.translated_from.entry("km".to_string()).or_default();
        km.insert("title".to_string(), SourceStamp::of("en", "Hello"));
        km.insert("body".to_string(), SourceStamp::of("en", "World"));

        let report = tracker().report(&doc);
        let km = &report.languages["km"];
        assert_eq!(km.status, TranslationStatus::Partial);
        assert_eq!(km.stale_fields, names(&["title"]));
        assert!(km.missing_fields.is_empty());
        // Unstamped values were written by hand
        assert_eq!(report.languages["es"].status, TranslationStatus::Complete);
        assert_eq!(report.complete, 2);
    }

    #[test]
    fn test_empty_document_is_missing_everywhere() {
        let doc = TranslatableDocument::new("a1", LanguageValues::new(), 1);
        let report = tracker().report(&doc);
        assert_eq!(report.missing, 3);
        assert_eq!(report.completion_rate, 0.0);
    }

    #[test]
    fn test_report_serializes_lowercase_status() {
        let doc = TranslatableDocument::new("a1", LanguageValues::new(), 1);
        let json = serde_json::to_value(tracker().report(&doc)).unwrap();
        assert_eq!(json["languages"]["km"]["status"], "missing");
        assert!(json.get("completionRate").is_some());
    }

    #[test]
    fn test_completion_rate_without_languages() {
        assert_eq!(completion_rate(0, 0, 0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_completion_rate_is_bounded(complete in 0usize..50, partial in 0usize..50, missing in 0usize..50) {
            let total = complete + partial + missing;
            let rate = completion_rate(complete, partial, total);
            prop_assert!((0.0..=1.0).contains(&rate));
            if total > 0 && missing == 0 && partial == 0 {
                prop_assert!((rate - 1.0).abs() < 1e-9);
            }
        }
    }
}
