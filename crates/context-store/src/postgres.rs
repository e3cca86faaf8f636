use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ContextStoreError, Result, SagaId, StoredContext, Version,
    store::{ContextStore, StoreOptions},
};

/// PostgreSQL-backed context store implementation.
///
/// One row per key in `place_order_contexts`; the `version` column carries
/// the optimistic concurrency check.
#[derive(Clone)]
pub struct PostgresContextStore {
    pool: PgPool,
}

impl PostgresContextStore {
    /// Creates a new PostgreSQL context store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_context(row: PgRow) -> Result<StoredContext> {
        Ok(StoredContext {
            saga_id: SagaId::from_uuid(row.try_get::<Uuid, _>("saga_id")?),
            state_name: row.try_get("state_name")?,
            version: Version::new(row.try_get("version")?),
            updated_at: row.try_get("updated_at")?,
            payload: row.try_get("payload")?,
        })
    }

    async fn current_version(&self, key: &str) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM place_order_contexts WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(Version::new(version.unwrap_or(0)))
    }

    async fn conflict(&self, key: &str, expected: Version) -> ContextStoreError {
        metrics::counter!("context_store_conflicts_total").increment(1);

        // Best effort: the row may have changed again since the failed write
        let actual = self.current_version(key).await.unwrap_or(expected);
        tracing::debug!(key, %expected, %actual, "Context version conflict");

        ContextStoreError::ConcurrencyConflict {
            key: key.to_string(),
            expected,
            actual,
        }
    }
}

#[async_trait]
impl ContextStore for PostgresContextStore {
    async fn store(
        &self,
        key: &str,
        context: StoredContext,
        options: StoreOptions,
    ) -> Result<Version> {
        let saga_id = context.saga_id.as_uuid();

        let version: Option<i64> = match options.expected_version {
            None => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO place_order_contexts (key, saga_id, state_name, version, updated_at, payload)
                    VALUES ($1, $2, $3, 1, NOW(), $4)
                    ON CONFLICT (key) DO UPDATE
                    SET saga_id = EXCLUDED.saga_id,
                        state_name = EXCLUDED.state_name,
                        version = place_order_contexts.version + 1,
                        updated_at = EXCLUDED.updated_at,
                        payload = EXCLUDED.payload
                    RETURNING version
                    "#,
                )
                .bind(key)
                .bind(saga_id)
                .bind(&context.state_name)
                .bind(&context.payload)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(expected) if expected == Version::initial() => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO place_order_contexts (key, saga_id, state_name, version, updated_at, payload)
                    VALUES ($1, $2, $3, 1, NOW(), $4)
                    ON CONFLICT (key) DO NOTHING
                    RETURNING version
                    "#,
                )
                .bind(key)
                .bind(saga_id)
                .bind(&context.state_name)
                .bind(&context.payload)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE place_order_contexts
                    SET saga_id = $3,
                        state_name = $4,
                        version = version + 1,
                        updated_at = NOW(),
                        payload = $5
                    WHERE key = $1 AND version = $2
                    RETURNING version
                    "#,
                )
                .bind(key)
                .bind(expected.as_i64())
                .bind(saga_id)
                .bind(&context.state_name)
                .bind(&context.payload)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match version {
            Some(v) => Ok(Version::new(v)),
            None => {
                let expected = options.expected_version.unwrap_or(Version::initial());
                Err(self.conflict(key, expected).await)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<StoredContext>> {
        let row = sqlx::query(
            r#"
            SELECT saga_id, state_name, version, updated_at, payload
            FROM place_order_contexts
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_context).transpose()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM place_order_contexts WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
