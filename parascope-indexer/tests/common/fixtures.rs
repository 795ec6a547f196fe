//! Container fixtures for store integration tests.
//!
//! These tests run against a real PostgreSQL instance in Docker.

use sqlx::PgPool;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

use parascope_indexer::store::PostgresStore;

/// A test database instance with pool and container.
///
/// The container is kept alive as long as this struct exists.
/// When dropped, the container is automatically stopped.
pub struct TestDb {
    /// The connection pool to the test database.
    pub pool: PgPool,
    /// The PostgresStore wrapping the pool.
    pub store: PostgresStore,
    /// The container (kept alive for the duration of the test).
    _container: ContainerAsync<Postgres>,
}

impl TestDb {
    /// Start a fresh PostgreSQL container and connect to it.
    ///
    /// # Panics
    ///
    /// Panics if container startup or connection fail.
    pub async fn new() -> Self {
        let container = Postgres::default()
            .start()
            .await
            .expect("Failed to start PostgreSQL container");

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        let connection_string = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = connect_with_retries(&connection_string, 30)
            .await
            .expect("Failed to connect to database");

        let store = PostgresStore::new(pool.clone());

        Self {
            pool,
            store,
            _container: container,
        }
    }
}

/// Connect to the database with retries.
///
/// PostgreSQL can take a moment to be fully ready even after the
/// container reports healthy.
async fn connect_with_retries(url: &str, max_attempts: u32) -> Result<PgPool, sqlx::Error> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match PgPool::connect(url).await {
            Ok(pool) => match sqlx::query("SELECT 1").execute(&pool).await {
                Ok(_) => return Ok(pool),
                Err(e) if attempts < max_attempts => {
                    tracing::debug!("Connection verify failed (attempt {attempts}): {e}");
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                }
                Err(e) => return Err(e),
            },
            Err(e) if attempts < max_attempts => {
                tracing::debug!("Connection failed (attempt {attempts}): {e}");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
