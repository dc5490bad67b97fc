//! Database pool construction and schema migration.
//!
//! The pool is built once at startup and handed to the controllers
//! explicitly; nothing in the crate reaches for a global handle. Foreign
//! keys are switched on per connection so deleting a todo cascades to its
//! subtodos.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

const CREATE_TODOS: &str = "\
CREATE TABLE IF NOT EXISTS todos (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL,
    description  TEXT,
    status       TEXT NOT NULL DEFAULT 'incomplete',
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    edited_at    TEXT,
    completed_at TEXT
)";

const CREATE_SUBTODOS: &str = "\
CREATE TABLE IF NOT EXISTS subtodos (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    todo_id      INTEGER NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'incomplete',
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    completed_at TEXT
)";

/// Open (creating if missing) the database and run the migration.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    info!("Database ready: {}", database_url);

    Ok(pool)
}

/// Create the schema if it does not exist yet.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TODOS).execute(pool).await?;
    sqlx::query(CREATE_SUBTODOS).execute(pool).await?;
    Ok(())
}
