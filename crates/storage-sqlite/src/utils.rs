//! Timestamp helpers for SQLite text columns.
//!
//! Instants are stored as RFC 3339 UTC strings with millisecond precision
//! (`2026-01-02T03:04:05.678Z`). That format sorts lexicographically in time
//! order, so range filters and `ORDER BY` work directly on the text.

use chrono::{DateTime, SecondsFormat, Utc};
use goalcoach_core::errors::{Error, Result, ValidationError};

pub fn to_db_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn from_db_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Validation(ValidationError::DateTimeParse(e)))
}

pub fn from_db_timestamp_opt(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(from_db_timestamp).transpose()
}
