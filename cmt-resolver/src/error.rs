//! Error types for cmt-resolver
//!
//! Every variant carries the identifiers needed to log or assert on it
//! without parsing the message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The store holds no documents under this correction name
    #[error("Correction '{0}' not found in the corrections database")]
    CorrectionNotFound(String),

    /// The name is in none of the known correction categories
    #[error("{name} not found, currently these are available: {}", available.join(", "))]
    UnknownCorrection { name: String, available: Vec<String> },

    #[error("run_id = {0} not found")]
    RunNotFound(String),

    #[error("Invalid run_id {run_id:?}: {reason}")]
    InvalidRunId { run_id: String, reason: String },

    #[error("Version {version} not found for correction {correction}, available: {}", available.join(", "))]
    VersionNotFound {
        correction: String,
        version: String,
        available: Vec<String>,
    },

    /// Global versions can only be applied through the binder
    #[error("User is not allowed to pass {version}, global versions are not allowed here")]
    GlobalVersionRejected { version: String },

    #[error("No value for correction {correction} version {version} at {at}")]
    NoValue {
        correction: String,
        version: String,
        at: String,
    },

    #[error("Invalid value for correction {correction} version {version}: {reason}")]
    InvalidValue {
        correction: String,
        version: String,
        reason: String,
    },

    /// A file-backed correction resolved to an empty reference
    #[error("Correction {correction} version {version} exists but does not reference a file")]
    FileNotResolved { correction: String, version: String },

    #[error("Channel list for {detector} is not contiguous: {reason}")]
    ChannelMisaligned { detector: String, reason: String },

    /// No gain data at all for this run
    #[error("to_pe (PMT gains) values are NaN, no data available for {run_id} in the gain model {model_type} with version {version}, please set constant values for {run_id}")]
    GainsAllMissing {
        run_id: String,
        model_type: String,
        version: String,
    },

    /// Some channels have no gain; processing cannot proceed
    #[error("Gains returned by CMT are missing for {model_type} ({version}) channels {channels:?}. Cannot proceed with processing")]
    GainsPartiallyMissing {
        run_id: String,
        model_type: String,
        version: String,
        channels: Vec<usize>,
    },

    #[error("Global version {label} not found! Try one of these: {}", available.join(", "))]
    UnknownGlobalVersion { label: String, available: Vec<String> },

    #[error("Global version {label} is malformed: {reason}")]
    MalformedGlobalVersion { label: String, reason: String },

    #[error("CMT version {global_version} is not compatible! It is missing these corrections: {}", missing.join(", "))]
    VersionIncompatible {
        global_version: String,
        missing: Vec<String>,
    },

    #[error("Invalid cache key: {0}")]
    InvalidCacheKey(String),

    /// Cache entry exists but cannot be decoded
    #[error("Cache entry {path} unreadable: {reason}")]
    Cache { path: String, reason: String },

    #[error(transparent)]
    Common(#[from] cmt_common::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Common(cmt_common::Error::Database(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Common(cmt_common::Error::Json(err))
    }
}
