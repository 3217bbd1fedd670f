//! Timestamp utilities
//!
//! The store keeps validity starts and run start times as text. Values with an
//! explicit offset are RFC 3339; values without one are naive UTC.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Naive layouts accepted for timestamps stored without an offset
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a stored timestamp, treating naive values as UTC
pub fn parse_utc(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::Timestamp(text.to_string()))
}

/// Format a timestamp the way it is written to the store
pub fn format_utc(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
