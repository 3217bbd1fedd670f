//! Correction categories
//!
//! Every correction name the resolver accepts belongs to exactly one
//! category. Classification happens once, at the start of a resolution.

use serde::Serialize;

/// Corrections holding one number per validity interval
pub const SCALAR_CORRECTIONS: &[&str] = &[
    "elife_xenon1t",
    "elife",
    "baseline_samples_nv",
    "electron_drift_velocity",
    "electron_drift_time_gate",
];

/// Corrections holding a fixed-length numeric array per validity interval
pub const ARRAY_CORRECTIONS: &[&str] = &[
    "hit_thresholds_tpc",
    "hit_thresholds_he",
    "hit_thresholds_nv",
    "hit_thresholds_mv",
];

/// Corrections whose value is a reference to an on-disk artifact
pub const FILE_CORRECTIONS: &[&str] = &[
    "mlp_model",
    "gcn_model",
    "cnn_model",
    "s2_xy_map",
    "s1_xyz_map_mlp",
    "s1_xyz_map_cnn",
    "s1_xyz_map_gcn",
    "fdc_map_mlp",
    "fdc_map_gcn",
    "fdc_map_cnn",
];

/// Gain model names, each backed by one group of per-channel corrections
pub const GAIN_MODELS: &[&str] = &["to_pe_model", "to_pe_model_nv", "to_pe_model_mv"];

/// Detector subsystem whose PMT gains form one gain model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GainDetector {
    Tpc,
    NeutronVeto,
    MuonVeto,
}

impl GainDetector {
    /// Prefix of the per-channel corrections of this detector ("pmt", "n_veto", "mu_veto")
    pub fn channel_prefix(&self) -> &'static str {
        match self {
            GainDetector::Tpc => "pmt",
            GainDetector::NeutronVeto => "n_veto",
            GainDetector::MuonVeto => "mu_veto",
        }
    }

    /// Generic model name exposed to callers
    pub fn model_type(&self) -> &'static str {
        match self {
            GainDetector::Tpc => "to_pe_model",
            GainDetector::NeutronVeto => "to_pe_model_nv",
            GainDetector::MuonVeto => "to_pe_model_mv",
        }
    }

    pub fn all() -> [GainDetector; 3] {
        [GainDetector::Tpc, GainDetector::NeutronVeto, GainDetector::MuonVeto]
    }
}

/// How a correction is retrieved and what shape its value has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CorrectionCategory {
    Scalar,
    Array,
    File,
    GainModel(GainDetector),
}

impl CorrectionCategory {
    /// Classify a correction name, `None` if it belongs to no category
    pub fn classify(name: &str) -> Option<Self> {
        if SCALAR_CORRECTIONS.contains(&name) {
            return Some(CorrectionCategory::Scalar);
        }
        if ARRAY_CORRECTIONS.contains(&name) {
            return Some(CorrectionCategory::Array);
        }
        if FILE_CORRECTIONS.contains(&name) {
            return Some(CorrectionCategory::File);
        }
        GainDetector::all()
            .into_iter()
            .find(|d| d.model_type() == name)
            .map(CorrectionCategory::GainModel)
    }

    /// Every accepted correction name, in category order
    pub fn known_names() -> Vec<String> {
        SCALAR_CORRECTIONS
            .iter()
            .chain(ARRAY_CORRECTIONS)
            .chain(FILE_CORRECTIONS)
            .chain(GAIN_MODELS)
            .map(|s| s.to_string())
            .collect()
    }

    /// Whether values of this category hold until superseded regardless of version
    pub fn always_step_fill(&self) -> bool {
        !matches!(self, CorrectionCategory::Scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_list() {
        assert_eq!(CorrectionCategory::classify("elife"), Some(CorrectionCategory::Scalar));
        assert_eq!(
            CorrectionCategory::classify("hit_thresholds_nv"),
            Some(CorrectionCategory::Array)
        );
        assert_eq!(CorrectionCategory::classify("fdc_map_gcn"), Some(CorrectionCategory::File));
        assert_eq!(
            CorrectionCategory::classify("to_pe_model_mv"),
            Some(CorrectionCategory::GainModel(GainDetector::MuonVeto))
        );
        assert_eq!(CorrectionCategory::classify("to_pe_model_xyz"), None);
        assert_eq!(CorrectionCategory::classify("pmt"), None);
    }

    #[test]
    fn test_lists_are_disjoint() {
        let names = CorrectionCategory::known_names();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());

        for name in &names {
            assert!(CorrectionCategory::classify(name).is_some(), "{} unclassified", name);
        }
    }

    #[test]
    fn test_gain_detector_names() {
        for detector in GainDetector::all() {
            assert_eq!(
                CorrectionCategory::classify(detector.model_type()),
                Some(CorrectionCategory::GainModel(detector))
            );
        }
        assert_eq!(GainDetector::NeutronVeto.channel_prefix(), "n_veto");
    }
}
