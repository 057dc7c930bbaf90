//! Web-of-Trust computation and trust-filtered aggregation.
//!
//! The trust graph is derived from follow lists one and two hops out from a
//! viewer. Content is fetched in bounded, concurrent batches and merged into a
//! deterministic newest-first order, then optionally restricted to authors the
//! viewer trusts.

pub mod aggregator;
pub mod batch;
pub mod cache;
pub mod error;
pub mod feed;
pub mod filter;
pub mod graph;

pub use aggregator::{
    rank_by_recency, Aggregate, AggregatorOptions, ContentAggregator, ItemScope, ListQuery, Timeline,
};
pub use batch::{partition, query_all, settle_all, BatchOutcome, Settled};
#[cfg(any(test, feature = "test-utils"))]
pub use cache::ManualClock;
pub use cache::{Clock, SystemClock, TtlCache};
pub use error::{Result, TrustError};
pub use feed::{trust_fingerprint, Feed, FeedService};
pub use filter::{apply_filter, effective_mode, Authored, FilterMode, FilterToggle};
pub use graph::{TrustDepth, TrustGraph, TrustGraphBuilder, TrustGraphOptions};
