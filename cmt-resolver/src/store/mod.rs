//! Document store client
//!
//! The resolver depends only on the [`CorrectionStore`] contract: read a
//! named correction as a time series table, and resolve that table at a
//! point in time.

use crate::error::Result;
use crate::table::{self, CorrectionTable, FillMode, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

mod sqlite;

pub use sqlite::SqliteCorrectionStore;

/// Read-only access to the corrections database
#[async_trait]
pub trait CorrectionStore: Send + Sync {
    /// Fetch the full time series of a named correction
    ///
    /// Fails with `Error::CorrectionNotFound` if the name is unknown upstream.
    async fn read(&self, name: &str) -> Result<CorrectionTable>;

    /// Resolve a table to the row active at `at`
    fn interpolate(&self, table: &CorrectionTable, at: DateTime<Utc>, mode: FillMode) -> Snapshot {
        table::interpolate(table, at, mode)
    }
}
