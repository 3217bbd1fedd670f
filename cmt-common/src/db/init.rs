//! Database initialization

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Create (if needed) and open a writable corrections mirror
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new corrections database: {}", db_path.display());
    } else {
        info!("Opened existing corrections database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every mirror table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_correction_documents_table(pool).await?;
    create_runs_table(pool).await?;
    Ok(())
}

/// One row per (correction, validity start, version) cell
///
/// `value` holds the JSON encoded cell. Insertion order (`id`) defines the
/// column order of a correction table.
async fn create_correction_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS correction_documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            correction TEXT NOT NULL,
            time TEXT NOT NULL,
            version TEXT NOT NULL,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_correction_documents_correction ON correction_documents(correction)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Run registry: nT runs are keyed by number, 1T runs by name
async fn create_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runs (
            number INTEGER,
            name TEXT,
            start TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_number ON runs(number)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_name ON runs(name)")
        .execute(pool)
        .await?;

    Ok(())
}
