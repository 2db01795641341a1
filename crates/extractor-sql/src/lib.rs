//! Postgres access for the extraction pipeline: pool construction and the
//! batched fill-only UPSERT sink.

mod upsert;

pub use self::upsert::{upsert_batch, BatchOutcome, ErrorClass, RecordFailure};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// Pool ceilings. The inserter is the only writer, so a small pool is
/// plenty; the ticker shares it for row counts.
const MAX_CONNECTIONS: u32 = 25;
const MIN_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct ConnectOpts {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

pub async fn connect(opts: &ConnectOpts) -> sqlx::Result<PgPool> {
    let pg_options = PgConnectOptions::new()
        .host(&opts.host)
        .port(opts.port)
        .database(&opts.database)
        .username(&opts.user)
        .password(&opts.password)
        .application_name("patent-extractor");

    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(MIN_CONNECTIONS)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(pg_options)
        .await
}

/// Round-trip probe used by `--test-config`.
pub async fn test_connection(pool: &PgPool) -> sqlx::Result<()> {
    sqlx::query("select 1").execute(pool).await?;
    Ok(())
}

/// Stored-row count for the progress ticker. Observational only.
pub async fn stored_row_count(pool: &PgPool, table: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("select count(*) from {}", table))
        .fetch_one(pool)
        .await
}
