pub mod submissions;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use crate::store::StoreError;

/// Lazily connected Postgres pool, shared for the life of the process.
///
/// The first caller connects and applies migrations; concurrent callers wait
/// on that same attempt. A failed attempt leaves the cell empty so the next
/// request retries.
pub struct Database {
    url: String,
    max_connections: u32,
    pool: OnceCell<PgPool>,
}

impl Database {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            pool: OnceCell::new(),
        }
    }

    pub async fn pool(&self) -> Result<&PgPool, StoreError> {
        self.pool
            .get_or_try_init(|| async {
                tracing::info!("Connecting to database");

                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url)
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;

                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| StoreError::Connection(format!("Failed to run migrations: {e}")))?;

                tracing::info!("Database connected, migrations applied");
                Ok::<_, StoreError>(pool)
            })
            .await
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            tracing::info!("Database pool closed");
        }
    }
}
