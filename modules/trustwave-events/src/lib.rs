//! Generic, domain-agnostic event records and the client contract.
//!
//! Records carry opaque tag arrays and a numeric kind. Zero knowledge of
//! playlists, follows, or trust. Consumers interpret kinds and tags themselves.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod reduce;
pub mod types;

pub use client::{query_with_deadline, EventClient};
pub use error::{ClientError, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryClient;
pub use reduce::{latest_by_author, merge_records, select_authoritative};
pub use types::{EventDraft, EventRecord, QueryFilter, Tags};
