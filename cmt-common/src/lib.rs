//! # CMT Common Library
//!
//! Shared code for the corrections management crates:
//! - Configuration loading (TOML + environment + CLI overrides)
//! - Detector generation handling
//! - SQLite mirror of the corrections store and run registry
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod detector;
pub mod error;
pub mod time;

pub use detector::DetectorGeneration;
pub use error::{Error, Result};
