use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    /// Повторяет идемпотентное чтение один раз при транзиентной ошибке.
    /// Только для чтений: запись выдачи мест так повторять нельзя,
    /// её нужно переоценивать от свежего снимка события.
    pub async fn retry_read<T, F, Fut>(&self, op: F) -> Result<T, sqlx::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        match op().await {
            Err(e) if is_transient(&e) => {
                warn!("retrying read after transient error: {:?}", e);
                op().await
            }
            other => other,
        }
    }
}

fn is_transient(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}
