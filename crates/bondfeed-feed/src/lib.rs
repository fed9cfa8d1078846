//! Live transaction view for the bond feed.
//!
//! - `FeedReducer`: pure merge of snapshot and incremental batches into a
//!   bounded, deduplicated, newest-first `FeedState`
//! - `LiveFeed`: binds a `FeedConnector`'s events to the reducer and tracks
//!   connection status for display

pub mod error;
pub mod live;
pub mod reducer;

pub use error::{FeedError, FeedResult};
pub use live::{LiveFeed, LiveSnapshot, CONNECTION_ERROR_MESSAGE};
pub use reducer::{FeedReducer, FeedState, DEFAULT_MAX_TRANSACTIONS};
