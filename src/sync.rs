//! The synchronization service: wires change detection, orchestration and
//! completeness tracking to a document store.

use crate::completeness::{CompletenessReport, CompletenessTracker, TranslationStatus};
use crate::config::Config;
use crate::detector::ChangeDetector;
use crate::error::SyncError;
use crate::i18n::{LanguageSet, MetricsReport, TranslationMetrics};
use crate::model::{ChangeNotification, TranslatableDocument};
use crate::orchestrator::{Orchestrator, ReconcileOutcome};
use crate::provider::TranslationProvider;
use crate::store::DocumentStore;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub struct TranslationSync {
    store: Arc<dyn DocumentStore>,
    languages: LanguageSet,
    fields: Vec<String>,
    detector: ChangeDetector,
    orchestrator: Orchestrator,
    tracker: CompletenessTracker,
    /// One reconcile at a time per document; waiters are served in order.
    document_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TranslationSync {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        languages: LanguageSet,
        fields: Vec<String>,
        detector: ChangeDetector,
        orchestrator: Orchestrator,
        tracker: CompletenessTracker,
    ) -> Self {
        Self {
            store,
            languages,
            fields,
            detector,
            orchestrator,
            tracker,
            document_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn TranslationProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let languages = config.language_set()?;
        info!("Translating with the '{}' provider", provider.name());
        let orchestrator = Orchestrator::new(
            provider,
            languages.clone(),
            config.orchestrator_settings(),
            Arc::new(TranslationMetrics::new()),
        );

        info!(
            "Translation sync: sources {:?} (priority {:?}), supported {:?}, fields {:?}",
            languages.sources(),
            languages.priority(),
            languages.supported(),
            config.translatable_fields
        );

        Ok(Self::new(
            store,
            languages,
            config.translatable_fields.clone(),
            config.detector()?,
            orchestrator,
            config.tracker()?,
        ))
    }

    pub fn languages(&self) -> &LanguageSet {
        &self.languages
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn metrics(&self) -> MetricsReport {
        self.orchestrator.metrics().report()
    }

    /// Detect and reconcile one write.
    pub async fn handle_notification(
        &self,
        notification: &ChangeNotification,
    ) -> Result<ReconcileOutcome, SyncError> {
        if notification.before.is_none() && notification.after.is_none() {
            return Err(SyncError::InvalidNotification(
                "notification carries neither a before nor an after snapshot".to_string(),
            ));
        }
        let event = self
            .detector
            .detect(notification.before.as_ref(), notification.after.as_ref());

        let lock = self.document_lock(&notification.document_id);
        let outcome = {
            let _guard = lock.lock().await;
            self.orchestrator.reconcile(&event, self.store.as_ref()).await
        };
        drop(lock);
        self.release_document_lock(&notification.document_id);

        let outcome = outcome?;
        debug!("{}: {:?}", notification.document_id, outcome);
        Ok(outcome)
    }

    pub async fn completeness_summary(
        &self,
        document_id: &str,
    ) -> Result<BTreeMap<String, TranslationStatus>, SyncError> {
        let doc = self.load(document_id).await?;
        Ok(self.tracker.summarize(&doc))
    }

    pub async fn completeness_report(
        &self,
        document_id: &str,
    ) -> Result<CompletenessReport, SyncError> {
        let doc = self.load(document_id).await?;
        Ok(self.tracker.report(&doc))
    }

    /// Consume store notifications until the channel closes.
    ///
    /// Each notification is handled on its own task; the per-document lock
    /// keeps reconciles of the same article from overlapping.
    pub async fn run_listener(self: Arc<Self>, mut notifications: broadcast::Receiver<ChangeNotification>) {
        info!("Listening for document change notifications");
        loop {
            match notifications.recv().await {
                Ok(notification) => {
                    let sync = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = sync.handle_notification(&notification).await {
                            error!("{}: reconcile failed: {}", notification.document_id, e);
                        }
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Change listener fell behind, {} notifications skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Change notification channel closed, stopping listener");
                    break;
                }
            }
        }
    }

    async fn load(&self, document_id: &str) -> Result<TranslatableDocument, SyncError> {
        self.store
            .get(document_id)
            .await?
            .ok_or_else(|| SyncError::UnknownDocument(document_id.to_string()))
    }

    fn document_lock(&self, document_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .document_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(document_id.to_string()).or_default())
    }

    fn release_document_lock(&self, document_id: &str) {
        let mut locks = self
            .document_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map still holds it: nobody is waiting
        if locks
            .get(document_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(document_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.document_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
