//! Global version resolution
//!
//! A global version binds every correction to one local version. The global
//! table stores one column per global version; its first row is an object
//! mapping correction name to local version string.

use crate::category::GainDetector;
use crate::error::{Error, Result};
use crate::store::CorrectionStore;
use crate::table::CorrectionTable;
use cmt_common::DetectorGeneration;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Label selecting the most recently appended global version
pub const LATEST: &str = "latest";

/// Correction name → local version
pub type LocalVersions = BTreeMap<String, String>;

pub struct GlobalVersionResolver {
    store: Arc<dyn CorrectionStore>,
    detector: DetectorGeneration,
}

impl GlobalVersionResolver {
    pub fn new(store: Arc<dyn CorrectionStore>, detector: DetectorGeneration) -> Self {
        Self { store, detector }
    }

    async fn read_global_table(&self) -> Result<CorrectionTable> {
        self.store.read(&self.detector.global_table()).await
    }

    /// Known global version labels, oldest first
    pub async fn global_versions(&self) -> Result<Vec<String>> {
        Ok(self.read_global_table().await?.columns().to_vec())
    }

    /// Local versions bound by a global version (`"latest"` for the newest)
    ///
    /// Per-channel gain entries are pruned; the channel-0 entry of each
    /// detector is returned under its gain model name instead.
    pub async fn local_versions(&self, label: &str) -> Result<LocalVersions> {
        let table = self.read_global_table().await?;
        let available = table.columns().to_vec();

        let label = if label == LATEST {
            available
                .last()
                .cloned()
                .ok_or_else(|| Error::UnknownGlobalVersion {
                    label: label.to_string(),
                    available: Vec::new(),
                })?
        } else {
            label.to_string()
        };

        if !label.contains("global") {
            warn!(
                label = %label,
                "'global' does not appear in the passed global version, is this right?"
            );
        }

        if !table.has_column(&label) {
            return Err(Error::UnknownGlobalVersion { label, available });
        }

        let cell = table
            .first_row_value(&label)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::MalformedGlobalVersion {
                label: label.clone(),
                reason: "cell is not a mapping of corrections to versions".to_string(),
            })?;

        let mut versions = LocalVersions::new();
        for (correction, version) in cell {
            let version = version.as_str().ok_or_else(|| Error::MalformedGlobalVersion {
                label: label.clone(),
                reason: format!("version of {} is not a string", correction),
            })?;
            versions.insert(correction.clone(), version.to_string());
        }

        let pruned = self.prune(&label, versions)?;
        debug!(label = %label, corrections = pruned.len(), "Resolved local versions");
        Ok(pruned)
    }

    /// Rename the reserved channel-0 gain keys, then drop per-channel keys
    fn prune(&self, label: &str, mut versions: LocalVersions) -> Result<LocalVersions> {
        let suffix = self.detector.gain_suffix();

        for detector in GainDetector::all() {
            let reserved = format!("{}_000{}", detector.channel_prefix(), suffix);
            let version = versions.get(&reserved).cloned().ok_or_else(|| {
                Error::MalformedGlobalVersion {
                    label: label.to_string(),
                    reason: format!("missing reserved gain entry {}", reserved),
                }
            })?;
            versions.insert(detector.model_type().to_string(), version);
        }

        versions.retain(|key, _| !key.contains(&suffix));
        Ok(versions)
    }
}
