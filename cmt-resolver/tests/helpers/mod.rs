//! Test Helper Utilities
//!
//! Shared fixtures for cmt-resolver integration tests: an in-memory
//! corrections mirror and store wrappers that count upstream calls.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cmt_common::db::{open_in_memory, seed};
use cmt_common::DetectorGeneration;
use cmt_resolver::runs::{RunRegistry, SqliteRunRegistry};
use cmt_resolver::store::SqliteCorrectionStore;
use cmt_resolver::{ArtifactCache, CorrectionResolver, CorrectionStore, CorrectionTable, Result};
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const RUN_ID: &str = "25000";

pub fn run_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 15, 0, 0, 0).unwrap()
}

pub fn day(month: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, month, d, 0, 0, 0).unwrap()
}

/// Store wrapper recording every read
pub struct CountingStore {
    inner: SqliteCorrectionStore,
    reads: Mutex<HashMap<String, usize>>,
}

impl CountingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteCorrectionStore::new(pool),
            reads: Mutex::new(HashMap::new()),
        }
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().values().sum()
    }

    pub fn reads_of(&self, name: &str) -> usize {
        self.reads.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CorrectionStore for CountingStore {
    async fn read(&self, name: &str) -> Result<CorrectionTable> {
        *self.reads.lock().unwrap().entry(name.to_string()).or_insert(0) += 1;
        self.inner.read(name).await
    }
}

/// Run registry wrapper counting lookups
pub struct CountingRuns {
    inner: SqliteRunRegistry,
    lookups: AtomicUsize,
}

impl CountingRuns {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteRunRegistry::new(pool, DetectorGeneration::Xenonnt),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunRegistry for CountingRuns {
    async fn start_time(&self, run_id: &str) -> Result<DateTime<Utc>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.start_time(run_id).await
    }
}

/// In-memory mirror with one registered run
pub async fn create_test_db() -> SqlitePool {
    let pool = open_in_memory().await.unwrap();
    seed::insert_run_number(&pool, RUN_ID.parse().unwrap(), run_start())
        .await
        .unwrap();
    pool
}

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub runs: Arc<CountingRuns>,
    pub resolver: CorrectionResolver,
}

/// Resolver over `pool` with counting wrappers and a cache in `cache_dir`
pub fn harness(pool: &SqlitePool, cache_dir: &Path) -> Harness {
    let store = Arc::new(CountingStore::new(pool.clone()));
    let runs = Arc::new(CountingRuns::new(pool.clone()));
    let resolver = CorrectionResolver::new(
        store.clone(),
        runs.clone(),
        ArtifactCache::new(cache_dir),
        DetectorGeneration::Xenonnt,
    );
    Harness {
        store,
        runs,
        resolver,
    }
}

pub fn channel_name(prefix: &str, channel: usize) -> String {
    format!("{}_{:03}_gain_xenonnt", prefix, channel)
}

/// Seed per-channel gain tables and the global channel listing
///
/// `gains[i]` is the ONLINE (and "v1") gain of channel i valid from June 1st;
/// `None` stores null.
pub async fn seed_gains(pool: &SqlitePool, prefix: &str, gains: &[Option<f64>]) {
    for (channel, gain) in gains.iter().enumerate() {
        let value = gain.map(Value::from).unwrap_or(Value::Null);
        seed::insert_document(
            pool,
            &channel_name(prefix, channel),
            day(6, 1),
            &[("ONLINE", value.clone()), ("v1", value)],
        )
        .await
        .unwrap();
    }
}

/// Seed the global table with a `global_ONLINE` listing of the given channels
/// plus extra global version columns
pub async fn seed_global(pool: &SqlitePool, channels: &[(&str, usize)], extra: &[(&str, Value)]) {
    let mut listing = Map::new();
    for (prefix, count) in channels {
        for channel in 0..*count {
            listing.insert(channel_name(prefix, channel), json!("ONLINE"));
        }
    }

    let mut cells: Vec<(&str, Value)> = vec![("global_ONLINE", Value::Object(listing))];
    cells.extend(extra.iter().cloned());
    seed::insert_document(pool, "global_xenonnt", day(1, 1), &cells)
        .await
        .unwrap();
}

/// Local version mapping of a complete global version
pub fn global_mapping(entries: &[(&str, &str)]) -> Value {
    let mut map = Map::new();
    for prefix in ["pmt", "n_veto", "mu_veto"] {
        for channel in 0..3 {
            map.insert(channel_name(prefix, channel), json!("v1"));
        }
    }
    for (k, v) in entries {
        map.insert(k.to_string(), json!(v));
    }
    Value::Object(map)
}
