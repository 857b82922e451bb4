use crate::error::StoreError;
use crate::model::{ChangeNotification, LanguageValues, Patch, TranslatableDocument, WriteOrigin};
use crate::store::{DocumentStore, UpdateOutcome};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

const NOTIFICATION_BUFFER: usize = 1024;

/// One author edit to a (language, field) pair. `None` clears the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub language: String,
    pub field: String,
    pub value: Option<String>,
}

impl FieldEdit {
    pub fn set(language: &str, field: &str, value: &str) -> Self {
        Self {
            language: language.to_string(),
            field: field.to_string(),
            value: Some(value.to_string()),
        }
    }

    pub fn clear(language: &str, field: &str) -> Self {
        Self {
            language: language.to_string(),
            field: field.to_string(),
            value: None,
        }
    }
}

/// In-process document store.
///
/// Every write, including accepted translation patches, is published as a
/// [`ChangeNotification`] to subscribers, the way a hosted document store
/// fires its write triggers.
pub struct MemoryStore {
    documents: RwLock<HashMap<String, TranslatableDocument>>,
    notifications: broadcast::Sender<ChangeNotification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            documents: RwLock::new(HashMap::new()),
            notifications,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.notifications.subscribe()
    }

    /// Seed a document without publishing a notification.
    pub async fn insert(&self, doc: TranslatableDocument) {
        self.documents.write().await.insert(doc.id.clone(), doc);
    }

    /// Apply an author's edits, creating the document if needed. Bumps the
    /// revision and returns (and publishes) the resulting notification.
    pub async fn author_write(&self, id: &str, edits: &[FieldEdit]) -> ChangeNotification {
        let mut documents = self.documents.write().await;
        let before = documents.get(id).cloned();

        let mut after = before
            .clone()
            .unwrap_or_else(|| TranslatableDocument::new(id, LanguageValues::new(), 0));
        for edit in edits {
            after
                .language_values
                .set(&edit.language, &edit.field, edit.value.clone());
        }
        after.revision += 1;
        after.last_write_origin = WriteOrigin::Author;
        after.updated_at = Utc::now();
        documents.insert(id.to_string(), after.clone());
        drop(documents);

        self.publish(ChangeNotification {
            document_id: id.to_string(),
            before,
            after: Some(after),
        })
    }

    /// Remove a document, publishing a delete notification if it existed.
    pub async fn delete(&self, id: &str) -> Option<ChangeNotification> {
        let before = self.documents.write().await.remove(id)?;
        Some(self.publish(ChangeNotification {
            document_id: id.to_string(),
            before: Some(before),
            after: None,
        }))
    }

    fn publish(&self, notification: ChangeNotification) -> ChangeNotification {
        // No subscribers is fine
        let _ = self.notifications.send(notification.clone());
        notification
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<TranslatableDocument>, StoreError> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn conditional_update(
        &self,
        id: &str,
        patch: &Patch,
        expected_revision: u64,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut documents = self.documents.write().await;
        let Some(current) = documents.get_mut(id) else {
            return Ok(UpdateOutcome::Conflict {
                current_revision: None,
            });
        };
        if current.revision != expected_revision {
            return Ok(UpdateOutcome::Conflict {
                current_revision: Some(current.revision),
            });
        }

        let before = current.clone();
        patch.apply_to(current);
        let after = current.clone();
        drop(documents);

        let revision = after.revision;
        self.publish(ChangeNotification {
            document_id: id.to_string(),
            before: Some(before),
            after: Some(after),
        });
        Ok(UpdateOutcome::Applied { revision })
    }
}
