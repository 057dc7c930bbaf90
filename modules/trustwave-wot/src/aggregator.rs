//! Content aggregation across authors and lists.
//!
//! Every query runs through one pipeline: fan out (one or more batches),
//! settle all, merge duplicates and replaceable coordinates, parse (dropping
//! malformed records), rank newest-first, truncate. There is no retry here.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use typed_builder::TypedBuilder;

use trustwave_common::kinds::{LIST_ITEM_KINDS, LIST_KINDS, TAG_LIST_REF, TAG_TOPIC};
use trustwave_common::{parse_item, parse_list, Config, ContentItem, ContentList, Identity};
use trustwave_events::{merge_records, EventClient, EventRecord, QueryFilter};

use crate::batch::{partition, settle_all};

/// Anything rankable by recency.
pub trait Timeline {
    fn created_at(&self) -> i64;
    fn event_id(&self) -> &str;
}

impl Timeline for ContentItem {
    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn event_id(&self) -> &str {
        &self.id
    }
}

impl Timeline for ContentList {
    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn event_id(&self) -> &str {
        &self.id
    }
}

/// Newest first; equal timestamps ordered by id so repeated runs agree.
pub fn rank_by_recency<T: Timeline>(items: &mut [T]) {
    items.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.event_id().cmp(b.event_id()))
    });
}

/// Merged result of a fan-out.
#[derive(Debug, Clone)]
pub struct Aggregate<T> {
    pub items: Vec<T>,
    pub batches: usize,
    pub failed_batches: usize,
}

impl<T> Aggregate<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            batches: 0,
            failed_batches: 0,
        }
    }

    /// No batch was lost.
    pub fn is_complete(&self) -> bool {
        self.failed_batches == 0
    }
}

/// What to fetch list items for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemScope {
    pub list_id: Option<String>,
    /// `Some(∅)` means "nobody" and yields nothing without a query.
    pub authors: Option<BTreeSet<Identity>>,
    pub limit: usize,
}

impl ItemScope {
    pub fn global(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn list(list_id: impl Into<String>, limit: usize) -> Self {
        Self {
            list_id: Some(list_id.into()),
            limit,
            ..Self::default()
        }
    }

    pub fn authors(authors: BTreeSet<Identity>, limit: usize) -> Self {
        Self {
            authors: Some(authors),
            limit,
            ..Self::default()
        }
    }
}

/// Which lists to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListQuery {
    Recent { limit: usize },
    ById(String),
    /// Tag is matched lowercased.
    ByTag(String),
    ByAuthor(Identity),
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct AggregatorOptions {
    #[builder(default = 100)]
    pub author_batch_size: usize,
    /// Upper bound on `limit` for any single author batch.
    #[builder(default = 100)]
    pub per_batch_limit: usize,
    #[builder(default = Duration::from_secs(8))]
    pub items_timeout: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub author_timeout: Duration,
    #[builder(default = Duration::from_secs(3))]
    pub lists_timeout: Duration,
    #[builder(default = Duration::from_secs(2))]
    pub list_timeout: Duration,
    #[builder(default = 200)]
    pub list_items_limit: usize,
    #[builder(default = 100)]
    pub author_items_limit: usize,
    #[builder(default = 20)]
    pub lists_limit: usize,
    /// How many recent lists `search_lists` looks through.
    #[builder(default = 50)]
    pub search_pool: usize,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&Config> for AggregatorOptions {
    fn from(config: &Config) -> Self {
        Self::builder()
            .author_batch_size(config.author_batch_size)
            .per_batch_limit(config.per_batch_limit)
            .items_timeout(config.items_timeout)
            .author_timeout(config.author_timeout)
            .lists_timeout(config.lists_timeout)
            .list_timeout(config.list_timeout)
            .build()
    }
}

/// Case-insensitive substring match on title, description, or any tag.
/// A blank query matches everything; otherwise the query is matched as typed,
/// surrounding whitespace included.
pub fn matches_search(list: &ContentList, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    list.title.to_lowercase().contains(&needle)
        || list.description.to_lowercase().contains(&needle)
        || list.tags.iter().any(|t| t.to_lowercase().contains(&needle))
}

pub struct ContentAggregator {
    client: Arc<dyn EventClient>,
    options: AggregatorOptions,
}

impl ContentAggregator {
    pub fn new(client: Arc<dyn EventClient>, options: AggregatorOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    async fn gather<T: Timeline>(
        &self,
        filters: Vec<QueryFilter>,
        timeout: Duration,
        parse: fn(&EventRecord) -> Option<T>,
        limit: usize,
        context: &str,
    ) -> Aggregate<T> {
        if filters.is_empty() {
            return Aggregate::empty();
        }

        let settled = settle_all(self.client.as_ref(), filters, timeout, context).await;
        let received = settled.records.len();
        let records = merge_records(settled.records);

        let mut items: Vec<T> = records.iter().filter_map(parse).collect();
        rank_by_recency(&mut items);
        items.truncate(limit);

        debug!(
            context,
            received,
            kept = items.len(),
            batches = settled.batches,
            failed_batches = settled.failed_batches,
            "Aggregated"
        );

        Aggregate {
            items,
            batches: settled.batches,
            failed_batches: settled.failed_batches,
        }
    }

    fn item_filters(&self, scope: &ItemScope) -> Vec<QueryFilter> {
        let mut base = QueryFilter::new().kinds(LIST_ITEM_KINDS);
        if let Some(list_id) = &scope.list_id {
            base = base.tag(TAG_LIST_REF, [list_id.as_str()]);
        }

        match &scope.authors {
            None => vec![base.limit(scope.limit)],
            Some(authors) => {
                let authors: Vec<&str> = authors.iter().map(Identity::as_str).collect();
                let per_batch = scope.limit.min(self.options.per_batch_limit);
                partition(&authors, self.options.author_batch_size)
                    .into_iter()
                    .map(|batch| base.clone().authors(batch).limit(per_batch))
                    .collect()
            }
        }
    }

    /// Items for `scope` with batch accounting.
    pub async fn fetch_items_report(&self, scope: &ItemScope, timeout: Duration) -> Aggregate<ContentItem> {
        let filters = self.item_filters(scope);
        self.gather(filters, timeout, parse_item, scope.limit, "list items")
            .await
    }

    pub async fn fetch_items(&self, scope: &ItemScope, timeout: Duration) -> Vec<ContentItem> {
        self.fetch_items_report(scope, timeout).await.items
    }

    /// Most recent items platform-wide.
    pub async fn fetch_global_recent(&self, limit: usize) -> Vec<ContentItem> {
        self.fetch_items(&ItemScope::global(limit), self.options.items_timeout)
            .await
    }

    /// Most recent items authored by members of `trust_set`.
    pub async fn fetch_trusted_recent(&self, trust_set: &BTreeSet<Identity>, limit: usize) -> Vec<ContentItem> {
        self.fetch_items(
            &ItemScope::authors(trust_set.clone(), limit),
            self.options.items_timeout,
        )
        .await
    }

    pub async fn fetch_by_list(&self, list_id: &str) -> Vec<ContentItem> {
        self.fetch_items(
            &ItemScope::list(list_id, self.options.list_items_limit),
            self.options.items_timeout,
        )
        .await
    }

    /// Everything `author` has added, across all lists.
    pub async fn fetch_by_author(&self, author: &Identity) -> Vec<ContentItem> {
        let scope = ItemScope::authors(BTreeSet::from([author.clone()]), self.options.author_items_limit);
        self.fetch_items(&scope, self.options.author_timeout).await
    }

    /// Lists for `query` with batch accounting.
    pub async fn fetch_lists_report(&self, query: &ListQuery) -> Aggregate<ContentList> {
        let base = QueryFilter::new().kinds(LIST_KINDS);
        let o = &self.options;
        let (filter, timeout, limit) = match query {
            ListQuery::Recent { limit } => (base.limit(*limit), o.lists_timeout, *limit),
            ListQuery::ById(id) => (base.ids([id.as_str()]), o.list_timeout, 1),
            ListQuery::ByTag(tag) => (
                base.tag(TAG_TOPIC, [tag.to_lowercase()]).limit(o.lists_limit),
                o.lists_timeout,
                o.lists_limit,
            ),
            ListQuery::ByAuthor(author) => (
                base.authors([author.as_str()]).limit(o.lists_limit),
                o.list_timeout,
                o.lists_limit,
            ),
        };
        self.gather(vec![filter], timeout, parse_list, limit, "lists")
            .await
    }

    pub async fn fetch_recent_lists(&self, limit: usize) -> Vec<ContentList> {
        self.fetch_lists_report(&ListQuery::Recent { limit }).await.items
    }

    pub async fn fetch_list(&self, list_id: &str) -> Option<ContentList> {
        self.fetch_lists_report(&ListQuery::ById(list_id.to_string()))
            .await
            .items
            .into_iter()
            .next()
    }

    pub async fn fetch_lists_by_tag(&self, tag: &str) -> Vec<ContentList> {
        self.fetch_lists_report(&ListQuery::ByTag(tag.to_lowercase()))
            .await
            .items
    }

    pub async fn fetch_lists_by_author(&self, author: &Identity) -> Vec<ContentList> {
        self.fetch_lists_report(&ListQuery::ByAuthor(author.clone()))
            .await
            .items
    }

    /// Recent lists matching `query`. See `matches_search`.
    pub async fn search_lists(&self, query: &str) -> Vec<ContentList> {
        let mut lists = self.fetch_recent_lists(self.options.search_pool).await;
        lists.retain(|list| matches_search(list, query));
        lists
    }
}
