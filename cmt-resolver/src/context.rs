//! Processing context seam
//!
//! The processing framework owns its configuration. The binder only needs to
//! read which options are CMT-controlled, know the position reconstruction
//! algorithm, and apply a complete set of substituted options in one call.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default position reconstruction algorithm when a context does not set one
pub const DEFAULT_RECONSTRUCTION_ALGORITHM: &str = "mlp";

/// A configuration option whose value is resolved from CMT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmtOption {
    /// Correction name as declared by the option
    pub correction: String,
    /// Local version
    pub version: String,
    /// Opaque metadata carried through binding unchanged
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl CmtOption {
    pub fn new(correction: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            correction: correction.into(),
            version: version.into(),
            extra: serde_json::Value::Null,
        }
    }
}

pub trait ProcessingContext {
    /// Every CMT-controlled option, keyed by option name
    fn cmt_options(&self) -> BTreeMap<String, CmtOption>;

    /// Name of the configured position reconstruction algorithm
    fn reconstruction_algorithm(&self) -> String;

    /// Apply a complete set of options in one update
    fn apply_cmt_config(&mut self, options: BTreeMap<String, CmtOption>);
}

/// Context described by a TOML file
///
/// ```toml
/// default_reconstruction_algorithm = "gcn"
///
/// [cmt_options.elife_conf]
/// correction = "elife"
/// version = "ONLINE"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticContext {
    #[serde(default)]
    pub default_reconstruction_algorithm: Option<String>,
    #[serde(default)]
    pub cmt_options: BTreeMap<String, CmtOption>,
}

impl StaticContext {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            cmt_common::Error::Config(format!("Failed to parse context TOML: {}", e)).into()
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            cmt_common::Error::Config(format!(
                "Failed to read context file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_option(mut self, name: impl Into<String>, option: CmtOption) -> Self {
        self.cmt_options.insert(name.into(), option);
        self
    }
}

impl ProcessingContext for StaticContext {
    fn cmt_options(&self) -> BTreeMap<String, CmtOption> {
        self.cmt_options.clone()
    }

    fn reconstruction_algorithm(&self) -> String {
        self.default_reconstruction_algorithm
            .clone()
            .unwrap_or_else(|| DEFAULT_RECONSTRUCTION_ALGORITHM.to_string())
    }

    fn apply_cmt_config(&mut self, options: BTreeMap<String, CmtOption>) {
        self.cmt_options.extend(options);
    }
}
