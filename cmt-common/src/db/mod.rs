//! SQLite mirror of the corrections store and run registry
//!
//! The resolution client only ever opens the mirror read-only. Schema
//! creation and seeding exist so that mirrors and test fixtures can be built.

use crate::{Error, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use std::time::Duration;

pub mod init;
pub mod seed;

pub use init::{create_schema, init_database};

/// Connect to the corrections mirror with read-only mode
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::Config(format!(
            "Corrections database not found: {}",
            db_path.display()
        )));
    }

    // mode=ro: the client never writes to the store
    let db_url = format!("sqlite://{}?mode=ro", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&db_url)
        .await?;

    Ok(pool)
}

/// Open a private in-memory mirror with the schema already created
///
/// In-memory SQLite databases are per connection, so the pool holds exactly one.
pub async fn open_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}
