// Batched fan-out over the event client.
//
// Large author sets are split into bounded batches, one query each. All
// batches are launched together and every outcome is collected before the
// caller proceeds: a failed batch never cancels its siblings.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use trustwave_events::{query_with_deadline, ClientError, EventClient, EventRecord, QueryFilter};

/// Split `items` into consecutive chunks of at most `size`. A size of zero is
/// treated as one.
pub fn partition<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Result of one batch query.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub result: Result<Vec<EventRecord>, ClientError>,
}

/// Surviving records of a fan-out plus how many batches were lost.
#[derive(Debug, Default)]
pub struct Settled {
    pub records: Vec<EventRecord>,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Issue one query per filter concurrently and wait for all of them.
/// Outcomes come back in filter order.
pub async fn query_all(
    client: &dyn EventClient,
    filters: Vec<QueryFilter>,
    timeout: Duration,
) -> Vec<BatchOutcome> {
    let queries = filters.into_iter().enumerate().map(|(index, filter)| async move {
        let result = query_with_deadline(client, std::slice::from_ref(&filter), timeout).await;
        BatchOutcome { index, result }
    });
    join_all(queries).await
}

/// `query_all`, folding outcomes into surviving records. Each failure is
/// logged at warn with `context` and counted.
pub async fn settle_all(
    client: &dyn EventClient,
    filters: Vec<QueryFilter>,
    timeout: Duration,
    context: &str,
) -> Settled {
    let outcomes = query_all(client, filters, timeout).await;
    let mut settled = Settled {
        batches: outcomes.len(),
        ..Settled::default()
    };

    for outcome in outcomes {
        match outcome.result {
            Ok(records) => {
                debug!(context, batch = outcome.index, records = records.len(), "Batch settled");
                settled.records.extend(records);
            }
            Err(e) => {
                warn!(context, batch = outcome.index, error = %e, "Batch query failed, continuing without it");
                settled.failed_batches += 1;
            }
        }
    }

    settled
}
