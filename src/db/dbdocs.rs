use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use super::store::{DocumentStore, StoreError, StoreResult};
use crate::models::CollaborativeDocument;

const DOCUMENT_COLUMNS: &str = "id, session_id, document_id, content, version, size_in_bytes, \
     is_active, created_at, updated_at, expires_at";

/// Postgres-backed document store
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    fn log_pool_state(&self, what: &str) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        info!(
            "{}. Pool connections: {} idle, {} in use",
            what,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

fn is_unique_violation(e: &SqlxError) -> bool {
    matches!(e, SqlxError::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_document(
        &self,
        session_id: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<CollaborativeDocument> {
        self.log_pool_state(&format!("Creating document for session {}", session_id));

        let doc = CollaborativeDocument::new(session_id, created_at, expires_at);
        let query_sql = r#"
            INSERT INTO collaborative_documents
                (id, session_id, document_id, content, version, size_in_bytes, is_active, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10);
        "#;
        let res = sqlx::query(query_sql)
            .bind(doc.id)
            .bind(doc.session_id)
            .bind(&doc.document_id)
            .bind(&doc.content)
            .bind(doc.version)
            .bind(doc.size_in_bytes)
            .bind(doc.is_active)
            .bind(doc.created_at)
            .bind(doc.updated_at)
            .bind(doc.expires_at)
            .execute(&self.pool)
            .await;

        match res {
            Ok(_) => {
                info!("Document '{}' created for session {}", doc.document_id, session_id);
                Ok(doc)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateSession(session_id)),
            Err(e) => {
                error!("Failed to create document for session {}: {}", session_id, e);
                Err(e.into())
            }
        }
    }

    async fn get_by_session_id(&self, session_id: i64) -> StoreResult<Option<CollaborativeDocument>> {
        let query_sql = format!(
            "SELECT {} FROM collaborative_documents WHERE session_id = $1",
            DOCUMENT_COLUMNS
        );
        let doc = sqlx::query_as::<_, CollaborativeDocument>(&query_sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    async fn get_by_document_id(&self, document_id: &str) -> StoreResult<Option<CollaborativeDocument>> {
        let query_sql = format!(
            "SELECT {} FROM collaborative_documents WHERE document_id = $1",
            DOCUMENT_COLUMNS
        );
        let doc = sqlx::query_as::<_, CollaborativeDocument>(&query_sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    async fn update_content(&self, doc: &CollaborativeDocument, expected_version: Option<i64>) -> StoreResult<i64> {
        self.log_pool_state(&format!("Updating content of document {}", doc.document_id));

        // $5 is NULL for unconditional writes
        let query_sql = r#"
            UPDATE collaborative_documents
            SET content = $1,
                size_in_bytes = $2,
                updated_at = $3,
                version = version + 1
            WHERE id = $4
                AND is_active
                AND ($5::BIGINT IS NULL OR version = $5)
            RETURNING version;
        "#;
        let version = sqlx::query_scalar::<_, i64>(query_sql)
            .bind(&doc.content)
            .bind(doc.size_in_bytes)
            .bind(doc.updated_at)
            .bind(doc.id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(version) = version {
            return Ok(version);
        }

        // Nothing matched, find out which guard refused the write
        let is_active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM collaborative_documents WHERE id = $1")
            .bind(doc.id)
            .fetch_optional(&self.pool)
            .await?;
        match (is_active, expected_version) {
            (Some(false), _) => Err(StoreError::Inactive(doc.document_id.clone())),
            (Some(true), Some(expected)) => Err(StoreError::VersionMismatch {
                document_id: doc.document_id.clone(),
                expected,
            }),
            _ => {
                error!("Document '{}' vanished before it could be saved", doc.document_id);
                Err(StoreError::Database(SqlxError::RowNotFound))
            }
        }
    }

    async fn deactivate_session(&self, session_id: i64, now: DateTime<Utc>) -> StoreResult<Option<String>> {
        let query_sql = r#"
            UPDATE collaborative_documents
            SET is_active = false,
                updated_at = $1
            WHERE session_id = $2
                AND is_active
            RETURNING document_id;
        "#;
        let document_id = sqlx::query_scalar::<_, String>(query_sql)
            .bind(now)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document_id)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM collaborative_documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<CollaborativeDocument>> {
        let query_sql = format!(
            "SELECT {} FROM collaborative_documents WHERE expires_at < $1",
            DOCUMENT_COLUMNS
        );
        let docs = sqlx::query_as::<_, CollaborativeDocument>(&query_sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(docs)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM collaborative_documents WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collaborative_documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }
}
