//! Bond reference data and market aggregates served by the REST backend.

use crate::transaction::Source;
use crate::wire;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bond listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub isin: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    /// Listing venue.
    #[serde(default, deserialize_with = "wire::optional_source")]
    pub exchange: Option<Source>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub face_value: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub coupon_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::optional_timestamp")]
    pub maturity_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub yield_to_maturity: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub last_price: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::optional_i64")]
    pub volume: Option<i64>,
}

/// Optional query filters for bond and transaction listings.
///
/// Unset fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BondFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl BondFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Aggregate market statistics.
///
/// The backend reports a loose map of aggregates; the well-known counters are
/// typed and everything else is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    #[serde(default)]
    pub total_bonds: Option<u64>,
    #[serde(default)]
    pub total_transactions: Option<u64>,
    #[serde(default)]
    pub total_volume: Option<i64>,
    #[serde(default)]
    pub average_yield: Option<Decimal>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
