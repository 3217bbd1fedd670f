//! Version binder: apply a global version to a processing context
//!
//! Either every CMT-controlled option of the context receives its local
//! version, or the context is left untouched and the error names every
//! option the global version cannot satisfy.

use crate::context::{CmtOption, ProcessingContext};
use crate::error::{Error, Result};
use crate::global_version::{GlobalVersionResolver, LocalVersions};
use std::collections::BTreeMap;
use tracing::info;

/// Corrections stored once per position reconstruction algorithm
pub const POSREC_CORRECTION_BASENAMES: &[&str] = &["s1_xyz_map", "fdc_map"];

/// Name under which a correction is listed in a global version
pub fn lookup_name(correction: &str, reconstruction_algorithm: &str) -> String {
    if POSREC_CORRECTION_BASENAMES.contains(&correction) {
        format!("{}_{}", correction, reconstruction_algorithm)
    } else {
        correction.to_string()
    }
}

/// Substitute local versions into a set of options without touching any context
pub fn substitute(
    global_version: &str,
    options: BTreeMap<String, CmtOption>,
    local_versions: &LocalVersions,
    reconstruction_algorithm: &str,
) -> Result<BTreeMap<String, CmtOption>> {
    let mut bound = BTreeMap::new();
    let mut missing = Vec::new();

    for (option, current) in options {
        let name = lookup_name(&current.correction, reconstruction_algorithm);
        match local_versions.get(&name) {
            Some(version) => {
                bound.insert(
                    option,
                    CmtOption {
                        version: version.clone(),
                        ..current
                    },
                );
            }
            None => missing.push(option),
        }
    }

    if !missing.is_empty() {
        return Err(Error::VersionIncompatible {
            global_version: global_version.to_string(),
            missing,
        });
    }

    Ok(bound)
}

pub struct VersionBinder<'a> {
    global_versions: &'a GlobalVersionResolver,
}

impl<'a> VersionBinder<'a> {
    pub fn new(global_versions: &'a GlobalVersionResolver) -> Self {
        Self { global_versions }
    }

    /// Bind every CMT option of `context` to the versions of `global_version`
    ///
    /// Returns the options that were applied.
    pub async fn bind<C: ProcessingContext + ?Sized>(
        &self,
        context: &mut C,
        global_version: &str,
    ) -> Result<BTreeMap<String, CmtOption>> {
        let local_versions = self.global_versions.local_versions(global_version).await?;
        let algorithm = context.reconstruction_algorithm();

        let bound = substitute(
            global_version,
            context.cmt_options(),
            &local_versions,
            &algorithm,
        )?;

        info!(
            global_version,
            options = bound.len(),
            algorithm = %algorithm,
            "Applying CMT global version"
        );
        context.apply_cmt_config(bound.clone());
        Ok(bound)
    }
}
