//! Document model: multilingual articles, translation patches and change
//! notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Who produced the most recent write to a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOrigin {
    /// A person edited one or more language fields.
    #[default]
    Author,
    /// The orchestrator applied a translation patch.
    Translation,
}

impl WriteOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOrigin::Author => "author",
            WriteOrigin::Translation => "translation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "author" => Some(WriteOrigin::Author),
            "translation" => Some(WriteOrigin::Translation),
            _ => None,
        }
    }
}

/// Per-language field text: language code -> field name -> value.
///
/// Blank values are never stored; an absent entry is a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageValues(BTreeMap<String, BTreeMap<String, String>>);

impl LanguageValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, handy for seeding documents.
    pub fn with(mut self, language: &str, field: &str, value: &str) -> Self {
        self.set(language, field, Some(value.to_string()));
        self
    }

    /// Populated text for a (language, field) pair.
    pub fn text(&self, language: &str, field: &str) -> Option<&str> {
        self.0
            .get(language)
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
    }

    /// Populated fields of one language.
    pub fn fields(&self, language: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(language)
            .into_iter()
            .flat_map(|fields| fields.keys().map(String::as_str))
    }

    /// Set or clear a value. Blank text clears.
    pub fn set(&mut self, language: &str, field: &str, value: Option<String>) {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(text) => {
                self.0
                    .entry(language.to_string())
                    .or_default()
                    .insert(field.to_string(), text);
            }
            None => {
                if let Some(fields) = self.0.get_mut(language) {
                    fields.remove(field);
                    if fields.is_empty() {
                        self.0.remove(language);
                    }
                }
            }
        }
    }

    /// Fields of `language` whose value differs between `previous` and `self`.
    /// Going from missing to populated, or back, counts as a change.
    pub fn changed_fields(
        &self,
        previous: Option<&LanguageValues>,
        language: &str,
        fields: &[String],
    ) -> BTreeSet<String> {
        fields
            .iter()
            .filter(|field| {
                let before = previous.and_then(|p| p.text(language, field));
                before != self.text(language, field)
            })
            .cloned()
            .collect()
    }

    /// Read values from a flat document (`title_en`, `body_km`, ...).
    ///
    /// Keys for unknown fields or languages and non-string values are ignored.
    pub fn from_flat(
        flat: &BTreeMap<String, serde_json::Value>,
        fields: &[String],
        languages: &[String],
    ) -> Self {
        let mut values = Self::new();
        for field in fields {
            for language in languages {
                let key = format!("{}_{}", field, language);
                if let Some(serde_json::Value::String(text)) = flat.get(&key) {
                    values.set(language, field, Some(text.clone()));
                }
            }
        }
        values
    }

    /// Flatten back to `field_language` keys.
    pub fn to_flat(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .flat_map(|(language, fields)| {
                fields
                    .iter()
                    .map(move |(field, text)| (format!("{}_{}", field, language), text.clone()))
            })
            .collect()
    }
}

/// Records which source text a translated value was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStamp {
    pub language: String,
    /// Hex SHA-256 of the source text.
    pub digest: String,
}

impl SourceStamp {
    pub fn of(language: &str, text: &str) -> Self {
        Self {
            language: language.to_string(),
            digest: format!("{:x}", Sha256::digest(text.as_bytes())),
        }
    }

    /// Whether `values` still holds the source text this stamp was taken from.
    pub fn matches(&self, values: &LanguageValues, field: &str) -> bool {
        values
            .text(&self.language, field)
            .is_some_and(|text| Self::of(&self.language, text) == *self)
    }
}

/// language -> field -> stamp of the text the value was translated from
pub type SourceStamps = BTreeMap<String, BTreeMap<String, SourceStamp>>;

/// An article kept available in every supported language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatableDocument {
    pub id: String,
    pub language_values: LanguageValues,
    /// Incremented on every accepted write; the staleness guard compares it.
    pub revision: u64,
    pub last_authoritative_language: Option<String>,
    #[serde(default)]
    pub last_write_origin: WriteOrigin,
    /// Values without a stamp were written by hand.
    #[serde(default)]
    pub translated_from: SourceStamps,
    pub updated_at: DateTime<Utc>,
}

/// A point-in-time copy of a document as delivered by a change notification.
pub type DocumentSnapshot = TranslatableDocument;

impl TranslatableDocument {
    pub fn new(id: &str, language_values: LanguageValues, revision: u64) -> Self {
        Self {
            id: id.to_string(),
            language_values,
            revision,
            last_authoritative_language: None,
            last_write_origin: WriteOrigin::Author,
            translated_from: SourceStamps::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn source_stamp(&self, language: &str, field: &str) -> Option<&SourceStamp> {
        self.translated_from
            .get(language)
            .and_then(|fields| fields.get(field))
    }

    /// A translated value whose source text has since changed or been removed.
    pub fn is_stale(&self, language: &str, field: &str) -> bool {
        self.language_values.text(language, field).is_some()
            && self
                .source_stamp(language, field)
                .is_some_and(|stamp| !stamp.matches(&self.language_values, field))
    }
}

/// Translated values computed against one revision of a document, applied
/// as a single conditional write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub document_id: String,
    /// Revision the patch was computed against.
    pub base_revision: u64,
    pub authoritative_language: String,
    /// language -> field -> new value (`None` clears the value)
    pub values: BTreeMap<String, BTreeMap<String, Option<String>>>,
    /// language -> field -> new source stamp (`None` drops it)
    pub stamps: BTreeMap<String, BTreeMap<String, Option<SourceStamp>>>,
}

impl Patch {
    pub fn new(document_id: &str, base_revision: u64, authoritative_language: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            base_revision,
            authoritative_language: authoritative_language.to_string(),
            values: BTreeMap::new(),
            stamps: BTreeMap::new(),
        }
    }

    /// Set a value. Clearing a value also drops its stamp.
    pub fn insert(&mut self, language: &str, field: &str, value: Option<String>) {
        if value.is_none() {
            self.stamps
                .entry(language.to_string())
                .or_default()
                .insert(field.to_string(), None);
        }
        self.values
            .entry(language.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Record the source text a value corresponds to.
    pub fn stamp(&mut self, language: &str, field: &str, stamp: SourceStamp) {
        self.stamps
            .entry(language.to_string())
            .or_default()
            .insert(field.to_string(), Some(stamp));
    }

    /// Revision the document will carry once the patch is applied.
    pub fn new_revision(&self) -> u64 {
        self.base_revision + 1
    }

    pub fn value_count(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.value_count() == 0 && self.stamps.values().all(BTreeMap::is_empty)
    }

    /// Apply to a document already known to be at `base_revision`.
    pub fn apply_to(&self, doc: &mut TranslatableDocument) {
        for (language, fields) in &self.values {
            for (field, value) in fields {
                doc.language_values.set(language, field, value.clone());
            }
        }
        for (language, fields) in &self.stamps {
            for (field, stamp) in fields {
                match stamp {
                    Some(stamp) => {
                        doc.translated_from
                            .entry(language.clone())
                            .or_default()
                            .insert(field.clone(), stamp.clone());
                    }
                    None => {
                        if let Some(stamps) = doc.translated_from.get_mut(language) {
                            stamps.remove(field);
                            if stamps.is_empty() {
                                doc.translated_from.remove(language);
                            }
                        }
                    }
                }
            }
        }
        doc.revision = self.new_revision();
        doc.last_authoritative_language = Some(self.authoritative_language.clone());
        doc.last_write_origin = WriteOrigin::Translation;
        doc.updated_at = Utc::now();
    }
}

/// Delivered by the document store whenever a document is written.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub document_id: String,
    pub before: Option<DocumentSnapshot>,
    pub after: Option<DocumentSnapshot>,
}

/// Wire form of a snapshot: metadata plus flat `field_language` keys.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatSnapshot {
    pub revision: u64,
    #[serde(default)]
    pub last_write_origin: WriteOrigin,
    #[serde(default)]
    pub last_authoritative_language: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl FlatSnapshot {
    pub fn into_document(
        self,
        id: &str,
        fields: &[String],
        languages: &[String],
    ) -> TranslatableDocument {
        TranslatableDocument {
            id: id.to_string(),
            language_values: LanguageValues::from_flat(&self.fields, fields, languages),
            revision: self.revision,
            last_authoritative_language: self.last_authoritative_language,
            last_write_origin: self.last_write_origin,
            translated_from: SourceStamps::new(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_blank_clears_value() {
        let mut values = LanguageValues::new().with("en", "title", "Hello");
        values.set("en", "title", Some("   ".to_string()));
        assert_eq!(values.text("en", "title"), None);
        assert_eq!(values, LanguageValues::new());
    }

    #[test]
    fn test_changed_fields_against_missing_previous() {
        let values = LanguageValues::new()
            .with("en", "title", "Hello")
            .with("en", "body", "World");
        let changed = values.changed_fields(None, "en", &names(&["title", "excerpt", "body"]));
        let expected: BTreeSet<String> = names(&["body", "title"]).into_iter().collect();
        assert_eq!(changed, expected);
    }

    #[test]
    fn test_changed_fields_detects_removal() {
        let previous = LanguageValues::new().with("en", "title", "Hello");
        let current = LanguageValues::new();
        let changed = current.changed_fields(Some(&previous), "en", &names(&["title"]));
        assert!(changed.contains("title"));
    }

    #[test]
    fn test_changed_fields_ignores_other_languages() {
        let previous = LanguageValues::new().with("en", "title", "Hello");
        let current = previous.clone().with("km", "title", "សួស្តី");
        assert!(current
            .changed_fields(Some(&previous), "en", &names(&["title"]))
            .is_empty());
    }

    #[test]
    fn test_from_flat_reads_known_keys_only() {
        let flat: BTreeMap<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
            "title_en": "Rice irrigation",
            "excerpt_en": null,
            "body_km": "ការស្រោចស្រព",
            "title_de": "Bewässerung",
            "author": "farmer-12",
            "views_en": 42
        }))
        .unwrap();

        let values = LanguageValues::from_flat(
            &flat,
            &names(&["title", "excerpt", "body"]),
            &names(&["en", "km"]),
        );
        assert_eq!(values.text("en", "title"), Some("Rice irrigation"));
        assert_eq!(values.text("en", "excerpt"), None);
        assert_eq!(values.text("km", "body"), Some("ការស្រោចស្រព"));
        assert_eq!(values.to_flat().len(), 2);
    }

    #[test]
    fn test_patch_apply_bumps_revision_and_marks_origin() {
        let mut doc = TranslatableDocument::new(
            "a1",
            LanguageValues::new()
                .with("en", "title", "Hello")
                .with("es", "body", "viejo"),
            4,
        );
        let mut patch = Patch::new("a1", 4, "en");
        patch.insert("es", "title", Some("Hola".to_string()));
        patch.insert("es", "body", None);

        patch.apply_to(&mut doc);

        assert_eq!(doc.revision, 5);
        assert_eq!(doc.language_values.text("es", "title"), Some("Hola"));
        assert_eq!(doc.language_values.text("es", "body"), None);
        assert_eq!(doc.last_authoritative_language.as_deref(), Some("en"));
        assert_eq!(doc.last_write_origin, WriteOrigin::Translation);
        assert_eq!(patch.value_count(), 2);
    }

    #[test]
    fn test_patch_apply_records_and_drops_stamps() {
        let mut doc = TranslatableDocument::new(
            "a1",
            LanguageValues::new()
                .with("en", "title", "Hello")
                .with("en", "body", "World"),
            1,
        );
        let mut first = Patch::new("a1", 1, "en");
        first.insert("km", "title", Some("[km] Hello".to_string()));
        first.stamp("km", "title", SourceStamp::of("en", "Hello"));
        first.insert("km", "body", Some("[km] World".to_string()));
        first.stamp("km", "body", SourceStamp::of("en", "World"));
        first.apply_to(&mut doc);
        assert_eq!(
            doc.source_stamp("km", "title"),
            Some(&SourceStamp::of("en", "Hello"))
        );

        let mut second = Patch::new("a1", 2, "en");
        second.insert("km", "body", None);
        second.apply_to(&mut doc);
        assert_eq!(doc.source_stamp("km", "body"), None);
        assert!(doc.source_stamp("km", "title").is_some());
    }

    #[test]
    fn test_translation_goes_stale_when_source_changes() {
        let mut doc = TranslatableDocument::new(
            "a1",
            LanguageValues::new()
                .with("en", "title", "Hello")
                .with("km", "title", "[km] Hello")
                .with("es", "title", "Hola a mano"),
            2,
        );
        doc.translated_from
            .entry("km".to_string())
            .or_default()
            .insert("title".to_string(), SourceStamp::of("en", "Hello"));
        assert!(!doc.is_stale("km", "title"));

        doc.language_values.set("en", "title", Some("Hello again".to_string()));
        assert!(doc.is_stale("km", "title"));
        // Hand-written values carry no stamp
        assert!(!doc.is_stale("es", "title"));

        doc.language_values.set("en", "title", None);
        assert!(doc.is_stale("km", "title"));
    }

    #[test]
    fn test_stamp_digest_depends_on_language_and_text() {
        let stamp = SourceStamp::of("en", "Hello");
        assert_eq!(stamp.digest.len(), 64);
        assert_eq!(stamp, SourceStamp::of("en", "Hello"));
        assert_ne!(stamp, SourceStamp::of("km", "Hello"));
        assert_ne!(stamp, SourceStamp::of("en", "Hello!"));
    }

    #[test]
    fn test_flat_snapshot_deserializes_wire_form() {
        let snapshot: FlatSnapshot = serde_json::from_value(serde_json::json!({
            "revision": 7,
            "lastWriteOrigin": "translation",
            "title_en": "Hello"
        }))
        .unwrap();
        assert_eq!(snapshot.revision, 7);
        assert_eq!(snapshot.last_write_origin, WriteOrigin::Translation);

        let doc = snapshot.into_document("a1", &names(&["title"]), &names(&["en"]));
        assert_eq!(doc.language_values.text("en", "title"), Some("Hello"));
        assert_eq!(doc.last_authoritative_language, None);
    }

    #[test]
    fn test_write_origin_round_trips_as_str() {
        for origin in [WriteOrigin::Author, WriteOrigin::Translation] {
            assert_eq!(WriteOrigin::parse(origin.as_str()), Some(origin));
        }
        assert_eq!(WriteOrigin::parse("robot"), None);
    }
}
