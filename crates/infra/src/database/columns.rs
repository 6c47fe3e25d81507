//! Column conversions shared by the repositories.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(index: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

pub(crate) fn from_optional_millis(
    index: usize,
    ms: Option<i64>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    ms.map(|ms| from_millis(index, ms)).transpose()
}

/// Parse a status-like text column through its `FromStr` table.
pub(crate) fn parse_text<T>(index: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|message| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into()))
}
