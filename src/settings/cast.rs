//! Permissive value coercion used by the typed accessors
//!
//! Every function returns `None` when the value cannot be coerced; the
//! accessors turn that into a zero value or the caller's fallback.

use super::SettingsMap;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

pub(crate) fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub(crate) fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s.trim()),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Integers are nanoseconds; strings use the `1h30m`, `250ms` notation
pub(crate) fn to_duration(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(n) => {
            if let Some(ns) = n.as_u64() {
                Some(Duration::from_nanos(ns))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| Duration::from_nanos(f as u64))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ns) = s.parse::<u64>() {
                return Some(Duration::from_nanos(ns));
            }
            parse_duration(s)
        }
        _ => None,
    }
}

/// Parse a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Negative durations are rejected.
pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() || s.starts_with('-') {
        return None;
    }
    if s == "0" {
        return Some(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total_nanos += number * scale;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(total_nanos.round() as u64))
}

/// Strings in RFC 3339 / RFC 2822, integers as unix seconds
pub(crate) fn to_time(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            OffsetDateTime::parse(s, &Rfc3339)
                .or_else(|_| OffsetDateTime::parse(s, &Rfc2822))
                .ok()
                .or_else(|| {
                    s.parse::<i64>()
                        .ok()
                        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
                })
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
        _ => None,
    }
}

/// Lists convert element-wise; a string is split on whitespace
pub(crate) fn to_string_slice(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(to_string).collect()),
        Value::String(s) => Some(s.split_whitespace().map(String::from).collect()),
        _ => None,
    }
}

/// Maps pass through; a string is parsed as a JSON object
pub(crate) fn to_string_map(value: &Value) -> Option<SettingsMap> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn to_string_map_string(value: &Value) -> Option<HashMap<String, String>> {
    to_string_map(value).map(|map| {
        map.into_iter()
            .map(|(k, v)| (k, to_string(&v).unwrap_or_default()))
            .collect()
    })
}

/// Lists of maps; non-map elements are dropped
pub(crate) fn to_map_array(value: &Value) -> Option<Vec<SettingsMap>> {
    let items = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
    )
}

/// Infer a typed value from an untyped string (booleans, numbers, JSON, else string)
#[cfg_attr(not(feature = "database"), allow(dead_code))]
pub(crate) fn infer_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }
    if trimmed.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else if let Ok(n) = trimmed.parse::<i64>() {
        Value::Number(n.into())
    } else if let Ok(n) = trimmed.parse::<f64>() {
        serde_json::Number::from_f64(n).map_or_else(|| Value::String(raw.to_string()), Value::Number)
    } else {
        Value::String(raw.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
