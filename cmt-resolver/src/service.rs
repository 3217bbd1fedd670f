//! Corrections service facade
//!
//! Owns one store connection and wires the resolver, the global version
//! resolver and the binder together.

use crate::binder::VersionBinder;
use crate::cache::ArtifactCache;
use crate::context::{CmtOption, ProcessingContext};
use crate::error::Result;
use crate::global_version::{GlobalVersionResolver, LocalVersions};
use crate::resolver::{ConfigModel, CorrectionResolver, ResolvedValue};
use crate::runs::{RunRegistry, SqliteRunRegistry};
use crate::store::{CorrectionStore, SqliteCorrectionStore};
use chrono::{DateTime, Utc};
use cmt_common::config::Config;
use cmt_common::db::connect_readonly;
use cmt_common::DetectorGeneration;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub struct CorrectionsService {
    detector: DetectorGeneration,
    resolver: CorrectionResolver,
    global_versions: GlobalVersionResolver,
}

impl CorrectionsService {
    /// Open the configured mirror read-only and build the service
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = connect_readonly(&config.database_path).await?;
        info!(
            database = %config.database_path.display(),
            detector = %config.detector,
            "Connected to corrections database (read-only)"
        );
        Ok(Self::from_pool(pool, config))
    }

    pub fn from_pool(pool: SqlitePool, config: &Config) -> Self {
        let store: Arc<dyn CorrectionStore> = Arc::new(SqliteCorrectionStore::new(pool.clone()));
        let runs: Arc<dyn RunRegistry> = Arc::new(SqliteRunRegistry::new(pool, config.detector));
        Self::with_components(
            store,
            runs,
            ArtifactCache::new(&config.cache_dir),
            config.detector,
            config.cacheable_versions.clone(),
        )
    }

    pub fn with_components(
        store: Arc<dyn CorrectionStore>,
        runs: Arc<dyn RunRegistry>,
        cache: ArtifactCache,
        detector: DetectorGeneration,
        cacheable_versions: Vec<String>,
    ) -> Self {
        let resolver = CorrectionResolver::new(store.clone(), runs, cache, detector)
            .with_cacheable_versions(cacheable_versions);
        let global_versions = GlobalVersionResolver::new(store, detector);

        Self {
            detector,
            resolver,
            global_versions,
        }
    }

    pub fn detector(&self) -> DetectorGeneration {
        self.detector
    }

    pub fn resolver(&self) -> &CorrectionResolver {
        &self.resolver
    }

    /// Resolve one (correction, version) descriptor for a run
    pub async fn get_corrections_config(
        &self,
        run_id: &str,
        model: &ConfigModel,
    ) -> Result<ResolvedValue> {
        self.resolver.resolve(run_id, model).await
    }

    pub async fn start_time(&self, run_id: &str) -> Result<DateTime<Utc>> {
        self.resolver.start_time(run_id).await
    }

    pub async fn global_versions(&self) -> Result<Vec<String>> {
        self.global_versions.global_versions().await
    }

    pub async fn local_versions(&self, label: &str) -> Result<LocalVersions> {
        self.global_versions.local_versions(label).await
    }

    /// Bind a global version (or "latest") onto a processing context
    pub async fn apply_cmt_version<C: ProcessingContext + ?Sized>(
        &self,
        context: &mut C,
        global_version: &str,
    ) -> Result<BTreeMap<String, CmtOption>> {
        VersionBinder::new(&self.global_versions)
            .bind(context, global_version)
            .await
    }
}

impl fmt::Display for CorrectionsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Corrections_Management_Services", self.detector.label())
    }
}
