//! Change detection: turn a (before, after) pair of snapshots into a
//! [`ChangeEvent`] naming the authoritative language and the fields it changed.

use crate::i18n::LanguageSet;
use crate::model::{DocumentSnapshot, WriteOrigin};
use crate::policy::{self, ChangesByLanguage};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Why a write produced nothing to translate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoChangeReason {
    /// No source-capable language changed in this write.
    NoSourceEdit,
    /// The write was a translation patch applied by the orchestrator.
    TranslationWrite,
    /// A new document whose authoritative language lacks required fields.
    MissingRequiredFields { language: String, missing: Vec<String> },
    /// Neither snapshot was present.
    EmptyNotification,
}

/// A write in which a source language was edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredChange {
    pub document_id: String,
    pub authoritative_language: String,
    /// Fields of the authoritative language changed by this write.
    pub changed_fields: BTreeSet<String>,
    /// Every supported language's changed fields in this write, used to
    /// protect manual translations made in the same write.
    pub changes_this_write: ChangesByLanguage,
    /// Revision of the snapshot the change was detected on.
    pub base_revision: u64,
    /// Other source languages that also changed but lost the tie-break.
    pub superseded_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Deleted {
        document_id: String,
    },
    NoChange {
        document_id: String,
        reason: NoChangeReason,
    },
    Authored(AuthoredChange),
}

impl ChangeEvent {
    pub fn document_id(&self) -> &str {
        match self {
            ChangeEvent::Deleted { document_id } => document_id,
            ChangeEvent::NoChange { document_id, .. } => document_id,
            ChangeEvent::Authored(change) => &change.document_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeDetector {
    languages: LanguageSet,
    fields: Vec<String>,
    required_fields: Vec<String>,
}

impl ChangeDetector {
    pub fn new(languages: LanguageSet, fields: Vec<String>, required_fields: Vec<String>) -> Self {
        Self {
            languages,
            fields,
            required_fields,
        }
    }

    /// Classify one write.
    ///
    /// When several source languages changed, the configured priority order
    /// picks the authoritative one and the others are reported as superseded.
    pub fn detect(
        &self,
        previous: Option<&DocumentSnapshot>,
        current: Option<&DocumentSnapshot>,
    ) -> ChangeEvent {
        let current = match (previous, current) {
            (_, Some(current)) => current,
            (Some(previous), None) => {
                return ChangeEvent::Deleted {
                    document_id: previous.id.clone(),
                }
            }
            (None, None) => {
                return ChangeEvent::NoChange {
                    document_id: String::new(),
                    reason: NoChangeReason::EmptyNotification,
                }
            }
        };
        let document_id = current.id.clone();

        if current.last_write_origin == WriteOrigin::Translation {
            debug!("{}: write came from a translation patch, ignoring", document_id);
            return ChangeEvent::NoChange {
                document_id,
                reason: NoChangeReason::TranslationWrite,
            };
        }

        let previous_values = previous.map(|p| &p.language_values);
        let changes_this_write: ChangesByLanguage = self
            .languages
            .supported()
            .iter()
            .map(|language| {
                let changed = current.language_values.changed_fields(
                    previous_values,
                    language,
                    &self.fields,
                );
                (language.clone(), changed)
            })
            .filter(|(_, changed)| !changed.is_empty())
            .collect();

        let candidates: BTreeSet<String> = self
            .languages
            .sources()
            .iter()
            .filter(|language| changes_this_write.contains_key(*language))
            .cloned()
            .collect();

        let Some(authoritative) =
            policy::select_authoritative(&candidates, self.languages.priority())
        else {
            debug!("{}: no source language changed", document_id);
            return ChangeEvent::NoChange {
                document_id,
                reason: NoChangeReason::NoSourceEdit,
            };
        };

        let superseded_sources: Vec<String> = self
            .languages
            .priority()
            .iter()
            .filter(|language| candidates.contains(*language) && **language != authoritative)
            .cloned()
            .collect();
        if !superseded_sources.is_empty() {
            warn!(
                "{}: source languages {:?} changed in the same write as '{}'; '{}' wins by priority",
                document_id, superseded_sources, authoritative, authoritative
            );
        }

        if previous.is_none() {
            let missing: Vec<String> = self
                .required_fields
                .iter()
                .filter(|field| current.language_values.text(&authoritative, field).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                warn!(
                    "{}: new article in '{}' is missing required fields {:?}",
                    document_id, authoritative, missing
                );
                return ChangeEvent::NoChange {
                    document_id,
                    reason: NoChangeReason::MissingRequiredFields {
                        language: authoritative,
                        missing,
                    },
                };
            }
        }

        let changed_fields = changes_this_write
            .get(&authoritative)
            .cloned()
            .unwrap_or_default();

        ChangeEvent::Authored(AuthoredChange {
            document_id,
            authoritative_language: authoritative,
            changed_fields,
            changes_this_write,
            base_revision: current.revision,
            superseded_sources,
        })
    }
}
