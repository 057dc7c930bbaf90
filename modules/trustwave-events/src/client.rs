// EventClient is the boundary to the relay pool. Everything above it sees
// records and filters only; signing and transport stay on the other side.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{ClientError, Result};
use crate::types::{EventDraft, EventRecord, QueryFilter};

#[async_trait]
pub trait EventClient: Send + Sync {
    /// Return the union of records matching any of `filters`. Implementations
    /// should give up after `timeout` and report `ClientError::Timeout`.
    async fn query(&self, filters: &[QueryFilter], timeout: Duration) -> Result<Vec<EventRecord>>;

    /// Sign and publish a draft, returning the stored record.
    async fn publish(&self, draft: EventDraft) -> Result<EventRecord>;
}

/// Run a query with the deadline enforced on this side as well, so a client
/// that ignores `timeout` still cannot stall the caller past it.
pub async fn query_with_deadline(
    client: &dyn EventClient,
    filters: &[QueryFilter],
    timeout: Duration,
) -> Result<Vec<EventRecord>> {
    match tokio::time::timeout(timeout, client.query(filters, timeout)).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(timeout_ms, filters = filters.len(), "Query deadline elapsed before the client answered");
            Err(ClientError::Timeout { timeout_ms })
        }
    }
}
