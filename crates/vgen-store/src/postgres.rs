//! Postgres tier for the `tasks` table.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, info_span, Instrument};

use vgen_models::{JobId, JobRecord};

use crate::error::StoreResult;
use crate::metrics::record_operation;
use crate::row::{TaskRow, COLUMNS};
use crate::store::{JobStore, StoreTier};

/// Upsert-with-coalesce. A terminal stored status freezes `status` and
/// `finished_at`; every other column keeps its stored value when the
/// incoming one is null.
const UPSERT: &str = "\
    INSERT INTO tasks (id, kind, status, prompt, params, file_id, public_url, error, \
                       topic, lang, started_at, finished_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
    ON CONFLICT (id) DO UPDATE SET \
        kind = COALESCE(EXCLUDED.kind, tasks.kind), \
        status = CASE WHEN tasks.status IN ('success', 'failed') \
                      THEN tasks.status ELSE EXCLUDED.status END, \
        prompt = COALESCE(EXCLUDED.prompt, tasks.prompt), \
        params = COALESCE(EXCLUDED.params, tasks.params), \
        file_id = COALESCE(EXCLUDED.file_id, tasks.file_id), \
        public_url = COALESCE(EXCLUDED.public_url, tasks.public_url), \
        error = COALESCE(EXCLUDED.error, tasks.error), \
        topic = COALESCE(EXCLUDED.topic, tasks.topic), \
        lang = COALESCE(EXCLUDED.lang, tasks.lang), \
        started_at = COALESCE(EXCLUDED.started_at, tasks.started_at), \
        finished_at = CASE WHEN tasks.status IN ('success', 'failed') \
                           THEN tasks.finished_at \
                           ELSE COALESCE(EXCLUDED.finished_at, tasks.finished_at) END, \
        updated_at = NOW()";

// =============================================================================
// Configuration
// =============================================================================

/// Postgres tier configuration.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Apply the embedded `tasks` migration on connect
    pub run_migrations: bool,
}

impl PostgresConfig {
    /// Create config from environment variables.
    ///
    /// Returns `None` when `DATABASE_URL` is unset, which disables the tier.
    pub fn from_env() -> Option<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        Some(Self {
            database_url,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(5),
            run_migrations: std::env::var("DATABASE_RUN_MIGRATIONS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// Primary persistent tier.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect a pool and optionally apply migrations.
    pub async fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        info!(max_connections = config.max_connections, "Postgres pool created");

        let store = Self { pool };
        if config.run_migrations {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Postgres migrations applied");
        Ok(())
    }

    async fn timed<T, F>(&self, operation: &str, fut: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>>,
    {
        let span = info_span!("store_request", tier = "postgres", operation = %operation);
        let start = Instant::now();
        let result = fut.instrument(span).await;
        record_operation(
            StoreTier::Postgres.as_str(),
            operation,
            result.is_ok(),
            start.elapsed().as_millis() as f64,
        );
        result
    }
}

#[async_trait]
impl JobStore for PostgresStore {
    fn tier(&self) -> StoreTier {
        StoreTier::Postgres
    }

    async fn put(&self, job: &JobRecord) -> StoreResult<()> {
        self.timed("put", async {
            sqlx::query(UPSERT)
                .bind(job.id.as_str())
                .bind(job.kind.map(|k| k.as_str()))
                .bind(job.status.as_str())
                .bind(&job.prompt)
                .bind(&job.params)
                .bind(&job.file_id)
                .bind(&job.public_url)
                .bind(&job.error)
                .bind(&job.topic)
                .bind(&job.lang)
                .bind(job.started_at)
                .bind(job.finished_at)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>> {
        self.timed("get", async {
            let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
            let row = sqlx::query_as::<_, TaskRow>(&query)
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;
            row.map(JobRecord::try_from).transpose()
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
