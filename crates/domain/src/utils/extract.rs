//! Ordered-fallback field extraction for external JSON payloads.
//!
//! Both platforms return the same logical field under different shapes
//! depending on endpoint and API version (`id` vs `appointment.id` vs
//! `event.id`). Callers declare a priority list of dot-separated paths per
//! field and take the first one that resolves to a usable value. Numeric path
//! segments index into arrays (`events.0.id`).
//!
//! `null`, empty strings and values of the wrong type are skipped, so a later
//! path still gets a chance.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values at or above this are milliseconds, below are seconds.
const EPOCH_MS_THRESHOLD: i64 = 100_000_000_000;

/// Resolve one dot-separated path. `null` resolves to `None`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// First non-null value along `paths`.
pub fn first_value<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| lookup(value, path))
}

/// First non-empty string. Numbers are accepted and rendered as text, since
/// several endpoints return numeric ids.
pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| match lookup(value, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First numeric value; numeric strings (`"1250.00"`) are accepted.
pub fn first_f64(value: &Value, paths: &[&str]) -> Option<f64> {
    paths.iter().find_map(|path| match lookup(value, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// First boolean; `"true"`/`"false"` strings are accepted.
pub fn first_bool(value: &Value, paths: &[&str]) -> Option<bool> {
    paths.iter().find_map(|path| match lookup(value, path)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// First value that parses as an instant, see [`parse_timestamp`].
pub fn first_timestamp(value: &Value, paths: &[&str]) -> Option<DateTime<Utc>> {
    paths.iter().find_map(|path| lookup(value, path).and_then(parse_timestamp))
}

/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM:SS` (read as UTC), and epoch
/// seconds or milliseconds as numbers or numeric strings.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Some(parsed.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            s.parse::<i64>().ok().and_then(from_epoch)
        }
        _ => None,
    }
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() >= EPOCH_MS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}
