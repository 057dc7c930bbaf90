// In-memory EventClient for tests.
//
// Holds a flat record set and answers filters the way a relay would: newest
// first, `limit` applied per filter, union across filters. Failure and latency
// can be scripted per author so batched callers can be exercised one batch at
// a time. Every query is logged.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::EventClient;
use crate::error::{ClientError, Result};
use crate::types::{EventDraft, EventRecord, QueryFilter};

struct MemoryClientInner {
    records: Vec<EventRecord>,
    failing_authors: HashSet<String>,
    slow_authors: HashMap<String, Duration>,
    reject_publish: bool,
    queries: Vec<Vec<QueryFilter>>,
    now: i64,
}

/// Stateful in-memory relay. Thread-safe via interior Mutex.
pub struct MemoryClient {
    signer: String,
    inner: Mutex<MemoryClientInner>,
}

impl MemoryClient {
    /// `signer` is the identity that `publish` signs as.
    pub fn new(signer: impl Into<String>) -> Self {
        Self {
            signer: signer.into(),
            inner: Mutex::new(MemoryClientInner {
                records: Vec::new(),
                failing_authors: HashSet::new(),
                slow_authors: HashMap::new(),
                reject_publish: false,
                queries: Vec::new(),
                now: 1_700_000_000,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryClientInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_record(self, record: EventRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn with_records(self, records: impl IntoIterator<Item = EventRecord>) -> Self {
        for record in records {
            self.insert(record);
        }
        self
    }

    /// Any query whose filters name `author` fails with a transport error.
    pub fn fail_for_author(self, author: impl Into<String>) -> Self {
        self.lock().failing_authors.insert(author.into());
        self
    }

    /// Any query whose filters name `author` takes `delay` to answer, or
    /// times out if `delay` exceeds the query's timeout.
    pub fn delay_for_author(self, author: impl Into<String>, delay: Duration) -> Self {
        self.lock().slow_authors.insert(author.into(), delay);
        self
    }

    pub fn reject_publishes(self) -> Self {
        self.lock().reject_publish = true;
        self
    }

    /// Timestamp the next publish will carry. Advances by one per publish.
    pub fn set_now(&self, now: i64) {
        self.lock().now = now;
    }

    pub fn insert(&self, record: EventRecord) {
        self.lock().records.push(record);
    }

    /// Filters of every query received, in arrival order.
    pub fn queries(&self) -> Vec<Vec<QueryFilter>> {
        self.lock().queries.clone()
    }

    pub fn query_count(&self) -> usize {
        self.lock().queries.len()
    }

    pub fn clear_queries(&self) {
        self.lock().queries.clear();
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().records.clone()
    }
}

fn named_authors(filters: &[QueryFilter]) -> impl Iterator<Item = &String> {
    filters
        .iter()
        .filter_map(|f| f.authors.as_ref())
        .flatten()
}

#[async_trait]
impl EventClient for MemoryClient {
    async fn query(&self, filters: &[QueryFilter], timeout: Duration) -> Result<Vec<EventRecord>> {
        let delay = {
            let mut inner = self.lock();
            inner.queries.push(filters.to_vec());

            if let Some(author) = named_authors(filters).find(|a| inner.failing_authors.contains(*a)) {
                return Err(ClientError::Transport(format!(
                    "MemoryClient: scripted failure for {author}"
                )));
            }

            named_authors(filters)
                .filter_map(|a| inner.slow_authors.get(a).copied())
                .max()
        };

        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ClientError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for filter in filters {
            let mut matched: Vec<&EventRecord> =
                inner.records.iter().filter(|r| filter.matches(r)).collect();
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            if let Some(limit) = filter.limit {
                matched.truncate(limit);
            }
            for record in matched {
                if seen.insert(record.id.clone()) {
                    out.push(record.clone());
                }
            }
        }
        Ok(out)
    }

    async fn publish(&self, draft: EventDraft) -> Result<EventRecord> {
        let mut inner = self.lock();
        if inner.reject_publish {
            return Err(ClientError::Rejected("MemoryClient: publishing disabled".into()));
        }
        let created_at = inner.now;
        inner.now += 1;

        let record = draft.into_record(self.signer.clone(), created_at);
        inner.records.push(record.clone());
        Ok(record)
    }
}
