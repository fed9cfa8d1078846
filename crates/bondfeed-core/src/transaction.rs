//! Transaction entity pushed over the live feed.

use crate::error::CoreError;
use crate::wire;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reporting venue of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    /// National Stock Exchange.
    Nse,
    /// Bombay Stock Exchange.
    Bse,
    /// National Securities Depository.
    Nsdl,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BSE",
            Self::Nsdl => "NSDL",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NSE" => Ok(Self::Nse),
            "BSE" => Ok(Self::Bse),
            "NSDL" => Ok(Self::Nsdl),
            other => Err(CoreError::InvalidSource(other.to_string())),
        }
    }
}

/// Unique transaction identifier.
///
/// The backend uses integer primary keys; the feed treats ids as opaque
/// strings so both integer and string ids compare consistently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for TransactionId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

/// A single bond trade print.
///
/// Every field is optional on the wire. A record without an `id` still decodes;
/// the feed reducer is responsible for excluding it from the view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub id: Option<TransactionId>,
    #[serde(default)]
    pub isin: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Backend foreign key, present on records produced by the bond database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bond_id: Option<i64>,
    #[serde(default)]
    pub trade_date: Option<String>,
    #[serde(default)]
    pub trade_time: Option<String>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub yield_value: Option<Decimal>,
    #[serde(default, alias = "quantity", deserialize_with = "wire::optional_i64")]
    pub volume: Option<i64>,
    #[serde(default, deserialize_with = "wire::optional_source")]
    pub source: Option<Source>,
    /// Ordering key of the live view.
    #[serde(default, alias = "timestamp", deserialize_with = "wire::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a transaction carrying only an id.
    pub fn new(id: impl Into<TransactionId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_isin(mut self, isin: impl Into<String>) -> Self {
        self.isin = Some(isin.into());
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Whether the record can take part in the live view.
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }
}

/// Parse a feed timestamp.
///
/// Accepts RFC 3339 (`2024-03-01T10:15:00Z`, `...+05:30`) and naive ISO-8601
/// (`2024-03-01T10:15:00.123456`, `2024-03-01 10:15:00`), the latter read as UTC.
pub fn parse_timestamp(s: &str) -> crate::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CoreError::InvalidTimestamp(s.to_string()))
}
