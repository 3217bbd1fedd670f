//! Correction store backed by the SQLite mirror

use super::CorrectionStore;
use crate::error::{Error, Result};
use crate::table::CorrectionTable;
use async_trait::async_trait;
use cmt_common::time::parse_utc;
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqliteCorrectionStore {
    pool: SqlitePool,
}

impl SqliteCorrectionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorrectionStore for SqliteCorrectionStore {
    async fn read(&self, name: &str) -> Result<CorrectionTable> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT time, version, value
            FROM correction_documents
            WHERE correction = ?
            ORDER BY id ASC
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(Error::CorrectionNotFound(name.to_string()));
        }

        let mut cells = Vec::with_capacity(rows.len());
        for (time, version, value) in rows {
            let time = parse_utc(&time)?;
            let value: serde_json::Value = serde_json::from_str(&value)?;
            cells.push((time, version, value));
        }

        let table = CorrectionTable::from_cells(name, cells);
        debug!(
            correction = name,
            rows = table.rows().len(),
            versions = table.columns().len(),
            "Read correction table"
        );
        Ok(table)
    }
}
