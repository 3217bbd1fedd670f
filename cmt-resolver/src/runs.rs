//! Run metadata lookup
//!
//! Maps a run identifier to its start time. The start time is the
//! interpolation point for every correction resolved for that run.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cmt_common::detector::RunKey;
use cmt_common::time::parse_utc;
use cmt_common::DetectorGeneration;
use sqlx::SqlitePool;
use tracing::debug;

#[async_trait]
pub trait RunRegistry: Send + Sync {
    /// Start time (UTC) of a run; `Error::RunNotFound` if unregistered
    async fn start_time(&self, run_id: &str) -> Result<DateTime<Utc>>;
}

/// Run registry backed by the `runs` table of the SQLite mirror
pub struct SqliteRunRegistry {
    pool: SqlitePool,
    detector: DetectorGeneration,
}

impl SqliteRunRegistry {
    pub fn new(pool: SqlitePool, detector: DetectorGeneration) -> Self {
        Self { pool, detector }
    }
}

#[async_trait]
impl RunRegistry for SqliteRunRegistry {
    async fn start_time(&self, run_id: &str) -> Result<DateTime<Utc>> {
        let key = self
            .detector
            .normalize_run_id(run_id)
            .map_err(|e| Error::InvalidRunId {
                run_id: run_id.to_string(),
                reason: e.to_string(),
            })?;

        let start: Option<String> = match &key {
            RunKey::Number(number) => {
                sqlx::query_scalar::<_, String>("SELECT start FROM runs WHERE number = ? LIMIT 1")
                    .bind(number)
                    .fetch_optional(&self.pool)
                    .await?
            }
            RunKey::Name(name) => {
                sqlx::query_scalar::<_, String>("SELECT start FROM runs WHERE name = ? LIMIT 1")
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        let start = start.ok_or_else(|| Error::RunNotFound(key.to_string()))?;
        let start = parse_utc(&start)?;
        debug!(run = %key, start = %start, "Resolved run start time");
        Ok(start)
    }
}
