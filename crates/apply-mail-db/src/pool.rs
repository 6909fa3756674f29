//! Connection pool construction.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use apply_mail_core::{MailError, MailResult};

use crate::schema::create_schema;

/// Alias used throughout the repository layer.
pub type DbPool = SqlitePool;

/// Connect to `database_url` and ensure the schema exists.
///
/// File-backed databases are created on first use.
pub async fn connect(database_url: &str) -> MailResult<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| MailError::Database(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(|e| MailError::Database(e.to_string()))?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Connect to a private in-memory database, for tests.
///
/// Pool size is pinned to one connection: each `sqlite::memory:` connection
/// would otherwise open its own empty database.
pub async fn connect_memory() -> MailResult<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| MailError::Database(e.to_string()))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| MailError::Database(e.to_string()))?;

    create_schema(&pool).await?;
    Ok(pool)
}
