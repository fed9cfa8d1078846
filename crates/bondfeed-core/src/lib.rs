//! Core domain types for the bond market feed.
//!
//! This crate provides the entities shared by the stream connector, the feed
//! reducer and the REST client:
//! - `Transaction`: a single trade print pushed over the live feed
//! - `TransactionId`: identifier used for deduplication
//! - `Source`: reporting exchange / depository (NSE, BSE, NSDL)
//! - `Bond`, `MarketStats`: REST response shapes

pub mod bond;
pub mod error;
pub mod transaction;
mod wire;

pub use bond::{Bond, BondFilter, MarketStats};
pub use error::{CoreError, Result};
pub use transaction::{Source, Transaction, TransactionId};
