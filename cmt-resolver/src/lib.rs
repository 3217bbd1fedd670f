//! cmt-resolver library - Corrections Management Services
//!
//! Resolves calibration values ("corrections") for a run and a version from
//! a time-indexed corrections store, caches derived gain arrays on disk, and
//! binds global versions onto processing contexts.

pub mod binder;
pub mod cache;
pub mod category;
pub mod context;
pub mod error;
pub mod global_version;
pub mod resolver;
pub mod runs;
pub mod service;
pub mod store;
pub mod table;

pub use cache::ArtifactCache;
pub use category::{CorrectionCategory, GainDetector};
pub use context::{CmtOption, ProcessingContext, StaticContext};
pub use error::{Error, Result};
pub use global_version::{GlobalVersionResolver, LocalVersions};
pub use resolver::{ConfigModel, CorrectionResolver, ResolvedValue};
pub use service::CorrectionsService;
pub use store::CorrectionStore;
pub use table::{CorrectionTable, FillMode};
