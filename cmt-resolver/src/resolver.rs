//! Correction resolver
//!
//! Resolves one (run, correction, version) triple to a value:
//! - scalar and array corrections: one table read, interpolated at the run start
//! - file-backed corrections: same, the value is a file reference
//! - gain models: one table per channel, assembled into a gain array and
//!   validated; cacheable versions go through the local artifact cache first
//!
//! Results are memoized for the lifetime of the resolver.

use crate::cache::ArtifactCache;
use crate::category::{CorrectionCategory, GainDetector};
use crate::error::{Error, Result};
use crate::runs::RunRegistry;
use crate::store::CorrectionStore;
use crate::table::FillMode;
use chrono::{DateTime, Utc};
use cmt_common::config::DEFAULT_CACHEABLE_VERSION;
use cmt_common::DetectorGeneration;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Version whose values always hold until superseded
pub const ONLINE_VERSION: &str = "ONLINE";

/// Column of the global table listing every per-channel gain correction
pub const GLOBAL_ONLINE_COLUMN: &str = "global_ONLINE";

/// A correction request: which correction, which local version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigModel {
    pub model_type: String,
    pub version: String,
}

impl ConfigModel {
    pub fn new(model_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            version: version.into(),
        }
    }
}

/// Resolved correction value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Scalar(f64),
    Array(Vec<f64>),
    /// Per-channel gains, indexed by channel number
    Gains(Vec<f32>),
    /// Reference to an artifact file
    File(String),
}

impl ResolvedValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ResolvedValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            ResolvedValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_gains(&self) -> Option<&[f32]> {
        match self {
            ResolvedValue::Gains(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&str> {
        match self {
            ResolvedValue::File(v) => Some(v),
            _ => None,
        }
    }
}

type MemoKey = (String, String, String);

pub struct CorrectionResolver {
    store: Arc<dyn CorrectionStore>,
    runs: Arc<dyn RunRegistry>,
    cache: ArtifactCache,
    detector: DetectorGeneration,
    cacheable_versions: Vec<String>,
    memo: RwLock<HashMap<MemoKey, ResolvedValue>>,
}

impl CorrectionResolver {
    pub fn new(
        store: Arc<dyn CorrectionStore>,
        runs: Arc<dyn RunRegistry>,
        cache: ArtifactCache,
        detector: DetectorGeneration,
    ) -> Self {
        Self {
            store,
            runs,
            cache,
            detector,
            cacheable_versions: vec![DEFAULT_CACHEABLE_VERSION.to_string()],
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the versions whose gain arrays may be cached on disk
    pub fn with_cacheable_versions(mut self, versions: Vec<String>) -> Self {
        self.cacheable_versions = versions;
        self
    }

    pub fn detector(&self) -> DetectorGeneration {
        self.detector
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn CorrectionStore> {
        &self.store
    }

    /// Start time of a run
    pub async fn start_time(&self, run_id: &str) -> Result<DateTime<Utc>> {
        self.runs.start_time(run_id).await
    }

    /// Resolve one correction for one run
    pub async fn resolve(&self, run_id: &str, model: &ConfigModel) -> Result<ResolvedValue> {
        let ConfigModel { model_type, version } = model;

        if version.contains("global") {
            return Err(Error::GlobalVersionRejected {
                version: version.clone(),
            });
        }

        let category = CorrectionCategory::classify(model_type).ok_or_else(|| {
            Error::UnknownCorrection {
                name: model_type.clone(),
                available: CorrectionCategory::known_names(),
            }
        })?;

        let key = (run_id.to_string(), model_type.clone(), version.clone());
        if let Some(hit) = self.memo.read().await.get(&key) {
            debug!(run = run_id, correction = %model_type, version = %version, "Memoized correction");
            return Ok(hit.clone());
        }

        debug!(
            run = run_id,
            correction = %model_type,
            version = %version,
            category = ?category,
            "Resolving correction"
        );

        let value = match category {
            CorrectionCategory::Scalar | CorrectionCategory::Array | CorrectionCategory::File => {
                self.resolve_single(run_id, model_type, version, category).await?
            }
            CorrectionCategory::GainModel(detector) => {
                ResolvedValue::Gains(self.resolve_gains(run_id, detector, version).await?)
            }
        };

        self.memo.write().await.insert(key, value.clone());
        Ok(value)
    }

    async fn resolve_single(
        &self,
        run_id: &str,
        correction: &str,
        version: &str,
        category: CorrectionCategory,
    ) -> Result<ResolvedValue> {
        let at = self.runs.start_time(run_id).await?;
        let table = self.store.read(correction).await?;
        let snapshot = self
            .store
            .interpolate(&table, at, fill_mode(category, version));
        let value = snapshot.value(version)?;

        let invalid = |reason: &str| Error::InvalidValue {
            correction: correction.to_string(),
            version: version.to_string(),
            reason: reason.to_string(),
        };

        if category == CorrectionCategory::File {
            return match value {
                Value::String(name) if !name.is_empty() => Ok(ResolvedValue::File(name.clone())),
                Value::Null | Value::String(_) | Value::Bool(false) => Err(Error::FileNotResolved {
                    correction: correction.to_string(),
                    version: version.to_string(),
                }),
                _ => Err(invalid("expected a file name")),
            };
        }

        if value.is_null() {
            return Err(Error::NoValue {
                correction: correction.to_string(),
                version: version.to_string(),
                at: at.to_rfc3339(),
            });
        }

        match category {
            CorrectionCategory::Scalar => value
                .as_f64()
                .map(ResolvedValue::Scalar)
                .ok_or_else(|| invalid("expected a number")),
            _ => value
                .as_array()
                .and_then(|items| items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>())
                .map(ResolvedValue::Array)
                .ok_or_else(|| invalid("expected an array of numbers")),
        }
    }

    async fn resolve_gains(
        &self,
        run_id: &str,
        detector: GainDetector,
        version: &str,
    ) -> Result<Vec<f32>> {
        let model_type = detector.model_type();

        let cache_path = if self.cacheable_versions.iter().any(|v| v == version) {
            Some(self.cache.name_for(run_id, model_type, version)?)
        } else {
            None
        };

        let cached = match &cache_path {
            Some(path) => match self.cache.load(path).await {
                Ok(hit) => hit,
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable cache entry, fetching from store");
                    None
                }
            },
            None => None,
        };
        let from_cache = cached.is_some();

        let gains = match cached {
            Some(gains) => gains,
            None => self.fetch_gains(run_id, detector, version).await?,
        };

        check_gains(run_id, model_type, version, &gains)?;

        if let (Some(path), false) = (&cache_path, from_cache) {
            if let Err(e) = self.cache.store(path, &gains).await {
                warn!(path = %path.display(), error = %e, "Failed to cache gains");
            }
        }

        Ok(gains)
    }

    /// Assemble the gain array from the per-channel tables
    async fn fetch_gains(
        &self,
        run_id: &str,
        detector: GainDetector,
        version: &str,
    ) -> Result<Vec<f32>> {
        let at = self.runs.start_time(run_id).await?;
        let channels = self.channel_corrections(detector).await?;

        let tables = try_join_all(channels.iter().map(|name| self.store.read(name))).await?;

        let mut gains = Vec::with_capacity(tables.len());
        for table in &tables {
            let snapshot = self.store.interpolate(table, at, FillMode::StepFill);
            let gain = match snapshot.value(version)? {
                Value::Null => f32::NAN,
                value => value.as_f64().map(|g| g as f32).ok_or_else(|| Error::InvalidValue {
                    correction: table.name().to_string(),
                    version: version.to_string(),
                    reason: "expected a number".to_string(),
                })?,
            };
            gains.push(gain);
        }

        debug!(
            run = run_id,
            detector = detector.channel_prefix(),
            channels = gains.len(),
            "Assembled gains from store"
        );
        Ok(gains)
    }

    /// Per-channel gain correction names, ordered by channel number
    ///
    /// The channel numbers listed in the global table must be exactly `0..n`.
    async fn channel_corrections(&self, detector: GainDetector) -> Result<Vec<String>> {
        let global_table = self.detector.global_table();
        let global = self.store.read(&global_table).await?;

        let listing = global
            .first_row_value(GLOBAL_ONLINE_COLUMN)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::MalformedGlobalVersion {
                label: GLOBAL_ONLINE_COLUMN.to_string(),
                reason: format!("{} has no channel listing", global_table),
            })?;

        let prefix = format!("{}_", detector.channel_prefix());
        let suffix = self.detector.gain_suffix();

        let mut channels = Vec::new();
        for key in listing.keys() {
            let Some(number) = key.strip_prefix(&prefix).and_then(|k| k.strip_suffix(&suffix)) else {
                continue;
            };
            let index = number.parse::<usize>().map_err(|_| Error::ChannelMisaligned {
                detector: detector.channel_prefix().to_string(),
                reason: format!("'{}' has no channel number", key),
            })?;
            channels.push((index, key.clone()));
        }
        channels.sort();

        for (expected, (index, key)) in channels.iter().enumerate() {
            if *index != expected {
                return Err(Error::ChannelMisaligned {
                    detector: detector.channel_prefix().to_string(),
                    reason: format!("expected channel {} but found {}", expected, key),
                });
            }
        }

        Ok(channels.into_iter().map(|(_, key)| key).collect())
    }
}

fn fill_mode(category: CorrectionCategory, version: &str) -> FillMode {
    if category.always_step_fill() || version == ONLINE_VERSION {
        FillMode::StepFill
    } else {
        FillMode::Interpolate
    }
}

/// Reject gain arrays containing the not-a-number sentinel
///
/// A channel that is off has gain 0; NaN means nobody knows, and processing
/// must not continue with it.
pub fn check_gains(run_id: &str, model_type: &str, version: &str, gains: &[f32]) -> Result<()> {
    let missing: Vec<usize> = gains
        .iter()
        .enumerate()
        .filter(|(_, gain)| gain.is_nan())
        .map(|(channel, _)| channel)
        .collect();

    if missing.len() == gains.len() {
        return Err(Error::GainsAllMissing {
            run_id: run_id.to_string(),
            model_type: model_type.to_string(),
            version: version.to_string(),
        });
    }

    if !missing.is_empty() {
        return Err(Error::GainsPartiallyMissing {
            run_id: run_id.to_string(),
            model_type: model_type.to_string(),
            version: version.to_string(),
            channels: missing,
        });
    }

    Ok(())
}
