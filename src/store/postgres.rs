use crate::error::StoreError;
use crate::model::{LanguageValues, Patch, SourceStamps, TranslatableDocument, WriteOrigin};
use crate::store::{DocumentStore, UpdateOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

type ArticleRow = (
    String,
    i64,
    String,
    Option<String>,
    String,
    String,
    DateTime<Utc>,
);

const SELECT_ARTICLE: &str = "SELECT id, revision, language_values, last_authoritative_language, \
     last_write_origin, translated_from, updated_at FROM articles WHERE id = $1";

/// PostgreSQL-backed document store.
///
/// Language values and their source stamps are stored as JSON text columns; the conditional write
/// locks the row (`SELECT ... FOR UPDATE`) so the revision check and the
/// update happen atomically.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                revision BIGINT NOT NULL,
                language_values TEXT NOT NULL DEFAULT '{}',
                last_authoritative_language TEXT,
                last_write_origin TEXT NOT NULL DEFAULT 'author',
                translated_from TEXT NOT NULL DEFAULT '{}',
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Tables created before source stamps existed
        sqlx::query(
            "ALTER TABLE articles ADD COLUMN IF NOT EXISTS translated_from TEXT NOT NULL DEFAULT '{}'",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_document(row: ArticleRow) -> Result<TranslatableDocument, StoreError> {
    let (id, revision, values_json, last_authoritative_language, origin, stamps_json, updated_at) =
        row;

    let language_values: LanguageValues =
        serde_json::from_str(&values_json).map_err(|e| StoreError::Serialization {
            id: id.clone(),
            details: e.to_string(),
        })?;
    let translated_from: SourceStamps =
        serde_json::from_str(&stamps_json).map_err(|e| StoreError::Serialization {
            id: id.clone(),
            details: format!("translated_from: {}", e),
        })?;
    let last_write_origin = WriteOrigin::parse(&origin).ok_or_else(|| StoreError::Serialization {
        id: id.clone(),
        details: format!("unknown write origin '{}'", origin),
    })?;
    let revision = u64::try_from(revision).map_err(|_| StoreError::Serialization {
        id: id.clone(),
        details: format!("negative revision {}", revision),
    })?;

    Ok(TranslatableDocument {
        id,
        language_values,
        revision,
        last_authoritative_language,
        last_write_origin,
        translated_from,
        updated_at,
    })
}

fn to_db_revision(revision: u64) -> Result<i64, StoreError> {
    i64::try_from(revision)
        .map_err(|_| StoreError::Backend(format!("revision {} out of range", revision)))
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, id: &str) -> Result<Option<TranslatableDocument>, StoreError> {
        let row: Option<ArticleRow> = sqlx::query_as(SELECT_ARTICLE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_document).transpose()
    }

    async fn conditional_update(
        &self,
        id: &str,
        patch: &Patch,
        expected_revision: u64,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let locking_select = format!("{} FOR UPDATE", SELECT_ARTICLE);
        let row: Option<ArticleRow> = sqlx::query_as(&locking_select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(UpdateOutcome::Conflict {
                current_revision: None,
            });
        };
        let mut doc = row_to_document(row)?;

        if doc.revision != expected_revision {
            debug!(
                "{}: expected revision {}, found {}",
                id, expected_revision, doc.revision
            );
            tx.rollback().await?;
            return Ok(UpdateOutcome::Conflict {
                current_revision: Some(doc.revision),
            });
        }

        patch.apply_to(&mut doc);
        let serialization = |e: serde_json::Error| StoreError::Serialization {
            id: id.to_string(),
            details: e.to_string(),
        };
        let values_json = serde_json::to_string(&doc.language_values).map_err(serialization)?;
        let stamps_json = serde_json::to_string(&doc.translated_from).map_err(serialization)?;

        sqlx::query(
            r#"
            UPDATE articles
            SET revision = $2,
                language_values = $3,
                last_authoritative_language = $4,
                last_write_origin = $5,
                translated_from = $6,
                updated_at = $7
            WHERE id = $1 AND revision = $8
            "#,
        )
        .bind(id)
        .bind(to_db_revision(doc.revision)?)
        .bind(values_json)
        .bind(doc.last_authoritative_language.clone())
        .bind(doc.last_write_origin.as_str())
        .bind(stamps_json)
        .bind(doc.updated_at)
        .bind(to_db_revision(expected_revision)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UpdateOutcome::Applied {
            revision: doc.revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceStamp;

    fn row(values: &str, origin: &str, revision: i64) -> ArticleRow {
        (
            "a1".to_string(),
            revision,
            values.to_string(),
            Some("en".to_string()),
            origin.to_string(),
            "{}".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_row_to_document() {
        let doc = row_to_document(row(r#"{"en":{"title":"Hello"}}"#, "translation", 4)).unwrap();
        assert_eq!(doc.revision, 4);
        assert_eq!(doc.language_values.text("en", "title"), Some("Hello"));
        assert_eq!(doc.last_write_origin, WriteOrigin::Translation);
    }

    #[test]
    fn test_row_reads_source_stamps() {
        let mut article = row(
            r#"{"en":{"title":"Hello"},"km":{"title":"[km] Hello"}}"#,
            "translation",
            2,
        );
        article.5 = serde_json::json!({
            "km": { "title": { "language": "en", "digest": SourceStamp::of("en", "Hello").digest } }
        })
        .to_string();

        let doc = row_to_document(article).unwrap();
        assert_eq!(
            doc.source_stamp("km", "title"),
            Some(&SourceStamp::of("en", "Hello"))
        );
        assert!(!doc.is_stale("km", "title"));
    }

    #[test]
    fn test_row_with_bad_json_is_serialization_error() {
        let err = row_to_document(row("not json", "author", 1)).unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[test]
    fn test_row_with_unknown_origin_is_rejected() {
        let err = row_to_document(row("{}", "robot", 1)).unwrap_err();
        assert!(err.to_string().contains("robot"));
    }

    #[test]
    fn test_row_with_negative_revision_is_rejected() {
        assert!(row_to_document(row("{}", "author", -1)).is_err());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database in DATABASE_URL"]
    async fn test_conditional_update_against_postgres() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let store = PgStore::connect(&url).await.unwrap();

        let id = format!("test-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        sqlx::query("INSERT INTO articles (id, revision, language_values) VALUES ($1, 1, $2)")
            .bind(&id)
            .bind(r#"{"en":{"title":"Hello"}}"#)
            .execute(&store.pool)
            .await
            .unwrap();

        let mut patch = Patch::new(&id, 1, "en");
        patch.insert("km", "title", Some("សួស្តី".to_string()));
        patch.stamp("km", "title", SourceStamp::of("en", "Hello"));

        let applied = store.conditional_update(&id, &patch, 1).await.unwrap();
        assert_eq!(applied, UpdateOutcome::Applied { revision: 2 });

        let stale = store.conditional_update(&id, &patch, 1).await.unwrap();
        assert_eq!(
            stale,
            UpdateOutcome::Conflict {
                current_revision: Some(2)
            }
        );

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.language_values.text("km", "title"), Some("សួស្តី"));
        assert!(doc.source_stamp("km", "title").is_some());

        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(&id)
            .execute(&store.pool)
            .await
            .unwrap();
    }
}
