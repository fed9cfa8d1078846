//! Lenient wire decoding helpers.
//!
//! The backend is loosely typed: ids arrive as integers or strings, timestamps
//! as naive ISO-8601, RFC 3339 or epoch milliseconds. A field that cannot be
//! interpreted decodes as absent so that one odd field never rejects a record.

use crate::transaction::{parse_timestamp, Source, TransactionId};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::str::FromStr;

pub(crate) fn optional_id<'de, D>(deserializer: D) -> Result<Option<TransactionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(TransactionId::new(s)),
        Some(Value::Number(n)) => Some(TransactionId::new(n.to_string())),
        _ => None,
    })
}

pub(crate) fn optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_timestamp(&s).ok(),
        Some(Value::Number(n)) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    })
}

pub(crate) fn optional_source<'de, D>(deserializer: D) -> Result<Option<Source>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

pub(crate) fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_decimal(s.trim()),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        _ => None,
    })
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

pub(crate) fn optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => integral(&n),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Integer value of `n`, accepting floats with no fractional part.
fn integral(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
