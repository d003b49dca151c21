//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 UTC text with fixed microsecond
//! precision so that lexical order in SQL equals chronological order.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for a TEXT column
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time formatted for a TEXT column
pub fn now_db() -> String {
    to_db(&now())
}

/// Parse a timestamp read back from a TEXT column
pub fn parse_db(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(Error::decode)
}
