//! Translation orchestration.
//!
//! For one [`ChangeEvent`]: pick the target languages, translate every
//! changed field into each of them with bounded concurrency, and submit all
//! successful results as a single patch guarded by the revision the event
//! was detected on.
//!
//! Fields a target is missing, or holds a translation of older source text
//! for, are translated along with the changed ones. An edit whose reconcile
//! was superseded is picked up this way by the next one.

use crate::detector::{AuthoredChange, ChangeEvent, NoChangeReason};
use crate::error::StoreError;
use crate::i18n::{LanguageSet, TranslationMetrics, TranslationValidator};
use crate::model::{Patch, SourceStamp, TranslatableDocument};
use crate::policy;
use crate::provider::{TranslationError, TranslationProvider};
use crate::retry::{with_retry_if, RetryConfig};
use crate::store::{DocumentStore, UpdateOutcome};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// In-flight provider calls allowed across every reconcile this
    /// orchestrator runs.
    pub max_concurrent_calls: usize,
    /// Retries after the first attempt for retryable failures.
    pub retry_max: u32,
    pub call_timeout: Duration,
    retry: RetryConfig,
}

impl OrchestratorSettings {
    pub fn new(
        max_concurrent_calls: usize,
        retry_max: u32,
        retry_initial_delay: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            max_concurrent_calls: max_concurrent_calls.max(1),
            retry_max,
            call_timeout,
            retry: RetryConfig::translation(retry_max, retry_initial_delay),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::new(6, 2, Duration::from_millis(500), Duration::from_secs(10))
    }
}

/// Why a reconcile wrote nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum NoOpReason {
    Deleted,
    NoChange(NoChangeReason),
    NoChangedFields,
    DocumentMissing,
    /// The document moved on before translation started.
    StaleSnapshot {
        base_revision: u64,
        current_revision: u64,
    },
    /// Every other language was edited by hand in the same write.
    NoEligibleTargets,
    /// Every translation failed.
    NothingTranslated,
}

/// A (field, language) pair left out of the patch.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub language: String,
    pub field: String,
    pub error: TranslationError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPatch {
    pub patch: Patch,
    pub failures: Vec<PairFailure>,
    /// Targets skipped because the author edited them in the same write.
    pub manual_targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Ready(PlannedPatch),
    NoOp(NoOpReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Applied {
        revision: u64,
        values: usize,
        failures: Vec<PairFailure>,
    },
    /// The staleness guard rejected the patch.
    Discarded {
        base_revision: u64,
        current_revision: Option<u64>,
    },
    NoOp(NoOpReason),
}

#[derive(Debug, Clone)]
struct TranslationJob {
    language: String,
    field: String,
    text: String,
}

pub struct Orchestrator {
    provider: Arc<dyn TranslationProvider>,
    languages: LanguageSet,
    settings: OrchestratorSettings,
    call_limit: Arc<Semaphore>,
    metrics: Arc<TranslationMetrics>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        languages: LanguageSet,
        settings: OrchestratorSettings,
        metrics: Arc<TranslationMetrics>,
    ) -> Self {
        let call_limit = Arc::new(Semaphore::new(settings.max_concurrent_calls));
        Self {
            provider,
            languages,
            settings,
            call_limit,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<TranslationMetrics> {
        &self.metrics
    }

    /// Run one reconcile against the store: fetch, plan, conditionally write.
    ///
    /// A conflicting write is not retried; the notification for the newer
    /// write triggers its own reconcile.
    pub async fn reconcile(
        &self,
        event: &ChangeEvent,
        store: &dyn DocumentStore,
    ) -> Result<ReconcileOutcome, StoreError> {
        let doc = match event {
            ChangeEvent::Authored(change) if !change.changed_fields.is_empty() => {
                store.get(&change.document_id).await?
            }
            _ => None,
        };

        let planned = match self.plan(event, doc.as_ref()).await {
            Plan::Ready(planned) => planned,
            Plan::NoOp(reason) => {
                debug!("{}: nothing to write ({:?})", event.document_id(), reason);
                self.metrics.record_noop();
                return Ok(ReconcileOutcome::NoOp(reason));
            }
        };

        let patch = &planned.patch;
        match store
            .conditional_update(&patch.document_id, patch, patch.base_revision)
            .await?
        {
            UpdateOutcome::Applied { revision } => {
                self.metrics.record_patch_applied();
                info!(
                    "{}: applied {} translated values from '{}' (revision {} -> {})",
                    patch.document_id,
                    patch.value_count(),
                    patch.authoritative_language,
                    patch.base_revision,
                    revision
                );
                Ok(ReconcileOutcome::Applied {
                    revision,
                    values: patch.value_count(),
                    failures: planned.failures,
                })
            }
            UpdateOutcome::Conflict { current_revision } => {
                self.metrics.record_conflict();
                debug!(
                    "{}: discarding patch computed at revision {}, document is at {:?}",
                    patch.document_id, patch.base_revision, current_revision
                );
                Ok(ReconcileOutcome::Discarded {
                    base_revision: patch.base_revision,
                    current_revision,
                })
            }
        }
    }

    /// Compute the patch for `event` against `doc` without writing it.
    pub async fn plan(&self, event: &ChangeEvent, doc: Option<&TranslatableDocument>) -> Plan {
        let change = match event {
            ChangeEvent::Deleted { .. } => return Plan::NoOp(NoOpReason::Deleted),
            ChangeEvent::NoChange { reason, .. } => {
                return Plan::NoOp(NoOpReason::NoChange(reason.clone()))
            }
            ChangeEvent::Authored(change) => change,
        };
        if change.changed_fields.is_empty() {
            return Plan::NoOp(NoOpReason::NoChangedFields);
        }

        let Some(doc) = doc else {
            warn!("{}: change notification for unknown document", change.document_id);
            return Plan::NoOp(NoOpReason::DocumentMissing);
        };
        if !policy::is_current(change.base_revision, doc.revision) {
            debug!(
                "{}: snapshot at revision {} is stale, document is at {}",
                change.document_id, change.base_revision, doc.revision
            );
            return Plan::NoOp(NoOpReason::StaleSnapshot {
                base_revision: change.base_revision,
                current_revision: doc.revision,
            });
        }

        let authoritative = change.authoritative_language.as_str();
        let (targets, manual_targets) = policy::select_targets(
            self.languages.targets_for(authoritative),
            authoritative,
            &change.changes_this_write,
        );

        let mut patch = Patch::new(&change.document_id, change.base_revision, authoritative);
        if !manual_targets.is_empty() {
            info!(
                "{}: not translating into {:?}, edited by hand in the same write",
                change.document_id, manual_targets
            );
            stamp_manual_edits(&mut patch, change, doc, &manual_targets);
        }
        if targets.is_empty() {
            if patch.is_empty() {
                return Plan::NoOp(NoOpReason::NoEligibleTargets);
            }
            return Plan::Ready(PlannedPatch {
                patch,
                failures: Vec::new(),
                manual_targets,
            });
        }

        let mut jobs = Vec::new();
        for language in &targets {
            for field in &fields_to_translate(change, doc, language) {
                match doc.language_values.text(authoritative, field) {
                    Some(text) => jobs.push(TranslationJob {
                        language: language.clone(),
                        field: field.clone(),
                        text: text.to_string(),
                    }),
                    // Source text was removed; clear the stale translation
                    None => {
                        if doc.language_values.text(language, field).is_some() {
                            patch.insert(language, field, None);
                        }
                    }
                }
            }
        }

        let results: Vec<(TranslationJob, Result<String, TranslationError>)> = stream::iter(jobs)
            .map(|job| self.translate_job(&change.document_id, job))
            .buffer_unordered(self.settings.max_concurrent_calls)
            .collect()
            .await;

        let mut failures = Vec::new();
        for (job, result) in results {
            match result {
                Ok(text) => {
                    let validation = TranslationValidator::validate(&job.text, &text);
                    if !validation.is_clean() {
                        warn!(
                            "{}: '{}' in '{}' may have lost content: {:?}",
                            change.document_id, job.field, job.language, validation.warnings
                        );
                    }
                    patch.insert(&job.language, &job.field, Some(text));
                    patch.stamp(
                        &job.language,
                        &job.field,
                        SourceStamp::of(authoritative, &job.text),
                    );
                }
                Err(error) => {
                    warn!(
                        "{}: leaving '{}' in '{}' untranslated: {}",
                        change.document_id, job.field, job.language, error
                    );
                    self.metrics.record_omitted_pair();
                    failures.push(PairFailure {
                        language: job.language,
                        field: job.field,
                        error,
                    });
                }
            }
        }

        if patch.value_count() == 0 {
            return Plan::NoOp(NoOpReason::NothingTranslated);
        }

        Plan::Ready(PlannedPatch {
            patch,
            failures,
            manual_targets,
        })
    }

    async fn translate_job(
        &self,
        document_id: &str,
        job: TranslationJob,
    ) -> (TranslationJob, Result<String, TranslationError>) {
        let operation = format!(
            "{}: translate '{}' into '{}' via {}",
            document_id,
            job.field,
            job.language,
            self.provider.name()
        );
        let provider = &self.provider;
        let call_limit = &self.call_limit;
        let metrics = &self.metrics;
        let call_timeout = self.settings.call_timeout;
        let retry_max = self.settings.retry_max;
        let text = job.text.as_str();
        let language = job.language.as_str();

        let result = with_retry_if(
            &self.settings.retry,
            &operation,
            || async move {
                let _permit = call_limit.acquire().await.map_err(|_| {
                    TranslationError::ProviderUnavailable("provider call limiter closed".to_string())
                })?;
                metrics.record_provider_call();

                let result =
                    match tokio::time::timeout(call_timeout, provider.translate(text, language))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(TranslationError::ProviderUnavailable(format!(
                            "no response within {:?}",
                            call_timeout
                        ))),
                    };
                if result.is_err() {
                    metrics.record_provider_failure();
                }
                result
            },
            |error: &TranslationError, attempt| {
                let retry = attempt < error.retry_budget(retry_max);
                if retry {
                    metrics.record_retry();
                }
                retry
            },
        )
        .await;

        (job, result)
    }
}

/// The changed fields, plus every source field `language` lacks or holds a
/// stale translation of.
fn fields_to_translate(
    change: &AuthoredChange,
    doc: &TranslatableDocument,
    language: &str,
) -> BTreeSet<String> {
    let mut fields = change.changed_fields.clone();
    for field in doc.language_values.fields(&change.authoritative_language) {
        let fresh = doc.language_values.text(language, field).is_some()
            && !doc.is_stale(language, field);
        if !fresh && fields.insert(field.to_string()) {
            debug!(
                "{}: catching up '{}' in '{}'",
                change.document_id, field, language
            );
        }
    }
    fields
}

/// Hand-edited target values count as matching the current source text.
fn stamp_manual_edits(
    patch: &mut Patch,
    change: &AuthoredChange,
    doc: &TranslatableDocument,
    manual_targets: &[String],
) {
    let authoritative = change.authoritative_language.as_str();
    for language in manual_targets {
        let Some(edited) = change.changes_this_write.get(language) else {
            continue;
        };
        for field in edited {
            let Some(source) = doc.language_values.text(authoritative, field) else {
                continue;
            };
            if doc.language_values.text(language, field).is_none() {
                continue;
            }
            let stamp = SourceStamp::of(authoritative, source);
            if doc.source_stamp(language, field) != Some(&stamp) {
                patch.stamp(language, field, stamp);
            }
        }
    }
}
