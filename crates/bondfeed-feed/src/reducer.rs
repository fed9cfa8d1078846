//! Feed reducer.
//!
//! Folds `initialData` and `newTransactions` payloads into one display-ready
//! view. Every state the reducer produces satisfies:
//! - no two entries share an `id`, and every entry has one
//! - at most `max_transactions` entries
//! - newest `created_at` first; entries without `created_at` after all
//!   timestamped ones, in delivery order

use crate::error::{FeedError, FeedResult};
use bondfeed_core::{Transaction, TransactionId};
use std::collections::HashSet;
use tracing::debug;

/// Maximum number of transactions kept in the live view.
pub const DEFAULT_MAX_TRANSACTIONS: usize = 100;

/// The live transaction view.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    transactions: Vec<Transaction>,
    loading: bool,
}

impl FeedState {
    /// Empty view, waiting for the initial snapshot.
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            loading: true,
        }
    }

    /// Transactions, newest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    /// `true` until the initial snapshot has been applied.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| tx.id.as_ref() == Some(id))
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure merge logic for the live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedReducer {
    max_transactions: usize,
}

impl FeedReducer {
    /// Reducer with the default cap of 100 transactions.
    pub fn new() -> Self {
        Self {
            max_transactions: DEFAULT_MAX_TRANSACTIONS,
        }
    }

    pub fn with_capacity(max_transactions: usize) -> FeedResult<Self> {
        if max_transactions == 0 {
            return Err(FeedError::InvalidCapacity(max_transactions));
        }
        Ok(Self { max_transactions })
    }

    pub fn max_transactions(&self) -> usize {
        self.max_transactions
    }

    /// Replace the view with a server snapshot and mark it ready.
    pub fn on_initial_data(
        &self,
        _state: FeedState,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> FeedState {
        FeedState {
            transactions: self.normalize(transactions),
            loading: false,
        }
    }

    /// Merge an incremental batch into the view.
    ///
    /// The batch goes ahead of the existing entries, so for a shared `id` the
    /// incoming version replaces the existing one. The result is then sorted
    /// (stable) and truncated.
    pub fn on_new_transactions(
        &self,
        state: FeedState,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> FeedState {
        let FeedState {
            transactions: existing,
            loading,
        } = state;

        FeedState {
            transactions: self.normalize(transactions.into_iter().chain(existing)),
            loading,
        }
    }

    /// Drop id-less records, keep the first occurrence of each id, sort
    /// newest first and cap.
    fn normalize(&self, combined: impl IntoIterator<Item = Transaction>) -> Vec<Transaction> {
        let mut seen: HashSet<TransactionId> = HashSet::new();
        let mut missing_id = 0usize;
        let mut duplicates = 0usize;

        let mut merged: Vec<Transaction> = combined
            .into_iter()
            .filter(|tx| match &tx.id {
                None => {
                    missing_id += 1;
                    false
                }
                Some(id) => {
                    let fresh = seen.insert(id.clone());
                    if !fresh {
                        duplicates += 1;
                    }
                    fresh
                }
            })
            .collect();

        // Option orders None below Some, so descending puts untimed entries last
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let evicted = merged.len().saturating_sub(self.max_transactions);
        merged.truncate(self.max_transactions);

        if missing_id > 0 || duplicates > 0 || evicted > 0 {
            debug!(
                missing_id,
                duplicates,
                evicted,
                kept = merged.len(),
                "Normalized feed view"
            );
        }

        merged
    }
}

impl Default for FeedReducer {
    fn default() -> Self {
        Self::new()
    }
}
