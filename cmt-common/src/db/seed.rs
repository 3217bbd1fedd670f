//! Write helpers for building mirrors and test fixtures

use crate::time::format_utc;
use crate::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

/// Insert one correction document: every (version, value) cell valid from `time`
pub async fn insert_document(
    pool: &SqlitePool,
    correction: &str,
    time: DateTime<Utc>,
    cells: &[(&str, Value)],
) -> Result<()> {
    let time = format_utc(&time);
    let mut tx = pool.begin().await?;

    for (version, value) in cells {
        sqlx::query(
            "INSERT INTO correction_documents (correction, time, version, value) VALUES (?, ?, ?, ?)",
        )
        .bind(correction)
        .bind(&time)
        .bind(*version)
        .bind(serde_json::to_string(value)?)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Register a XENONnT run by number
pub async fn insert_run_number(pool: &SqlitePool, number: i64, start: DateTime<Utc>) -> Result<()> {
    sqlx::query("INSERT INTO runs (number, start) VALUES (?, ?)")
        .bind(number)
        .bind(format_utc(&start))
        .execute(pool)
        .await?;
    Ok(())
}

/// Register a XENON1T run by name
pub async fn insert_run_name(pool: &SqlitePool, name: &str, start: DateTime<Utc>) -> Result<()> {
    sqlx::query("INSERT INTO runs (name, start) VALUES (?, ?)")
        .bind(name)
        .bind(format_utc(&start))
        .execute(pool)
        .await?;
    Ok(())
}
