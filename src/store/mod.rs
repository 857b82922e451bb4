//! Document store boundary.
//!
//! The store must offer atomic single-document read-modify-write. All
//! translation writes go through [`DocumentStore::conditional_update`], which
//! refuses to apply a patch once the document has moved past the revision the
//! patch was computed against.

mod memory;
mod postgres;

pub use memory::{FieldEdit, MemoryStore};
pub use postgres::PgStore;

use crate::error::StoreError;
use crate::model::{Patch, TranslatableDocument};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Patch applied; the document is now at `revision`.
    Applied { revision: u64 },
    /// The document is gone or no longer at the expected revision.
    Conflict { current_revision: Option<u64> },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<TranslatableDocument>, StoreError>;

    /// Apply `patch` only if the document is still at `expected_revision`.
    async fn conditional_update(
        &self,
        id: &str,
        patch: &Patch,
        expected_revision: u64,
    ) -> Result<UpdateOutcome, StoreError>;
}
