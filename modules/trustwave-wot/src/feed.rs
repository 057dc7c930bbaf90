//! Cached access to trust graphs and trust-filtered content.
//!
//! `FeedService` is what the application talks to. It wraps the graph
//! builder and the aggregator behind three TTL caches, and invalidates the
//! entries a publish makes stale.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use trustwave_common::{
    follow_list_draft, parse_follow_set, parse_item, parse_list, Config, ContentItem, ContentList,
    Identity, NewList, NewTrack,
};
use trustwave_events::EventClient;

use crate::aggregator::{matches_search, Aggregate, AggregatorOptions, ContentAggregator, ItemScope, ListQuery};
use crate::cache::{Clock, SystemClock, TtlCache};
use crate::error::{Result, TrustError};
use crate::filter::{apply_filter, FilterMode, FilterToggle};
use crate::graph::{TrustGraph, TrustGraphBuilder, TrustGraphOptions};

/// Item cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ItemQuery {
    GlobalRecent { limit: usize },
    /// `fingerprint` identifies the trust set the items were fetched for.
    TrustedRecent { fingerprint: String, limit: usize },
    ByList(String),
    ByAuthor(Identity),
}

/// Items served plus the mode they were filtered under.
#[derive(Debug, Clone, Serialize)]
pub struct Feed<T> {
    pub mode: FilterMode,
    pub items: Vec<T>,
}

/// Hex SHA-256 over the sorted members of `trust_set`.
pub fn trust_fingerprint(trust_set: &BTreeSet<Identity>) -> String {
    let mut hasher = Sha256::new();
    for identity in trust_set {
        hasher.update(identity.as_str().as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

pub struct FeedService {
    client: Arc<dyn EventClient>,
    builder: TrustGraphBuilder,
    graph_options: TrustGraphOptions,
    aggregator: ContentAggregator,
    graphs: TtlCache<Identity, Arc<TrustGraph>>,
    items: TtlCache<ItemQuery, Vec<ContentItem>>,
    lists: TtlCache<ListQuery, Vec<ContentList>>,
}

impl FeedService {
    pub fn new(client: Arc<dyn EventClient>, config: &Config) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    pub fn with_clock(client: Arc<dyn EventClient>, config: &Config, clock: Arc<dyn Clock>) -> Self {
        config.log_summary();
        Self {
            builder: TrustGraphBuilder::new(client.clone()),
            graph_options: TrustGraphOptions::from(config),
            aggregator: ContentAggregator::new(client.clone(), AggregatorOptions::from(config)),
            graphs: TtlCache::new(config.wot_ttl, clock.clone()),
            items: TtlCache::new(config.items_ttl, clock.clone()),
            lists: TtlCache::new(config.lists_ttl, clock),
            client,
        }
    }

    /// The viewer's trust graph, from cache when fresh. A logged-out viewer
    /// has no graph.
    pub async fn trust_graph(&self, viewer: Option<&Identity>) -> Result<Option<Arc<TrustGraph>>> {
        let Some(viewer) = viewer else {
            return Ok(None);
        };

        if let Some(graph) = self.graphs.get_fresh(viewer) {
            debug!(viewer = %viewer, "Trust graph cache hit");
            return Ok(Some(graph));
        }
        debug!(viewer = %viewer, "Trust graph cache miss");

        let graph = Arc::new(self.builder.build(viewer, &self.graph_options).await?);
        if graph.is_complete() {
            self.graphs.insert(viewer.clone(), graph.clone());
        } else {
            debug!(viewer = %viewer, failed_batches = graph.failed_batches, "Partial trust graph, not caching");
        }
        Ok(Some(graph))
    }

    /// Graph used for filtering. Only built when the viewer wants Trusted.
    /// A build failure degrades to no graph.
    async fn filtering_graph(&self, viewer: Option<&Identity>, toggle: &FilterToggle) -> Option<Arc<TrustGraph>> {
        if toggle.preference() == FilterMode::Global {
            return None;
        }
        match self.trust_graph(viewer).await {
            Ok(graph) => graph,
            Err(e) => {
                warn!(error = %e, "Trust graph unavailable, serving global feed");
                None
            }
        }
    }

    /// Recent items across the platform, or across the viewer's trust set.
    pub async fn activity(&self, viewer: Option<&Identity>, toggle: &FilterToggle, limit: usize) -> Feed<ContentItem> {
        let graph = self.filtering_graph(viewer, toggle).await;
        let mode = toggle.effective(viewer, graph.as_deref());
        let timeout = self.aggregator.options().items_timeout;

        let items = match (mode, graph.as_deref()) {
            (FilterMode::Trusted, Some(graph)) => {
                let key = ItemQuery::TrustedRecent {
                    fingerprint: trust_fingerprint(&graph.all),
                    limit,
                };
                self.cached_items(key, ItemScope::authors(graph.all.clone(), limit), timeout)
                    .await
            }
            _ => {
                self.cached_items(ItemQuery::GlobalRecent { limit }, ItemScope::global(limit), timeout)
                    .await
            }
        };
        Feed { mode, items }
    }

    /// Items of one list, restricted to trusted authors when that mode applies.
    pub async fn list_feed(&self, viewer: Option<&Identity>, list_id: &str, toggle: &FilterToggle) -> Feed<ContentItem> {
        let options = self.aggregator.options();
        let scope = ItemScope::list(list_id, options.list_items_limit);
        let items = self
            .cached_items(ItemQuery::ByList(list_id.to_string()), scope, options.items_timeout)
            .await;

        let graph = self.filtering_graph(viewer, toggle).await;
        let mode = toggle.effective(viewer, graph.as_deref());
        let items = match (mode, graph.as_deref()) {
            (FilterMode::Trusted, Some(graph)) => apply_filter(items, graph, mode),
            _ => items,
        };
        Feed { mode, items }
    }

    pub async fn author_items(&self, author: &Identity) -> Vec<ContentItem> {
        let options = self.aggregator.options();
        let scope = ItemScope::authors(BTreeSet::from([author.clone()]), options.author_items_limit);
        self.cached_items(ItemQuery::ByAuthor(author.clone()), scope, options.author_timeout)
            .await
    }

    pub async fn recent_lists(&self, limit: usize) -> Vec<ContentList> {
        self.cached_lists(ListQuery::Recent { limit }).await
    }

    pub async fn list(&self, list_id: &str) -> Option<ContentList> {
        self.cached_lists(ListQuery::ById(list_id.to_string()))
            .await
            .into_iter()
            .next()
    }

    pub async fn lists_by_tag(&self, tag: &str) -> Vec<ContentList> {
        self.cached_lists(ListQuery::ByTag(tag.to_lowercase())).await
    }

    pub async fn lists_by_author(&self, author: &Identity) -> Vec<ContentList> {
        self.cached_lists(ListQuery::ByAuthor(author.clone())).await
    }

    pub async fn search_lists(&self, query: &str) -> Vec<ContentList> {
        let limit = self.aggregator.options().search_pool;
        let mut lists = self.cached_lists(ListQuery::Recent { limit }).await;
        lists.retain(|list| matches_search(list, query));
        lists
    }

    pub async fn publish_list(&self, list: NewList) -> Result<ContentList> {
        let record = self
            .client
            .publish(list.into_draft())
            .await
            .map_err(TrustError::Publish)?;
        let list = parse_list(&record).ok_or_else(|| TrustError::Unparseable {
            id: record.id.clone(),
            kind: record.kind,
        })?;

        self.lists.clear();
        info!(list_id = %list.id, author = %list.author, "List published");
        Ok(list)
    }

    pub async fn add_track(&self, track: NewTrack) -> Result<ContentItem> {
        let record = self
            .client
            .publish(track.into_draft())
            .await
            .map_err(TrustError::Publish)?;
        let item = parse_item(&record).ok_or_else(|| TrustError::Unparseable {
            id: record.id.clone(),
            kind: record.kind,
        })?;

        self.items.invalidate_where(|key| match key {
            ItemQuery::GlobalRecent { .. } | ItemQuery::TrustedRecent { .. } => true,
            ItemQuery::ByList(list_id) => *list_id == item.list_id,
            ItemQuery::ByAuthor(author) => *author == item.author,
        });
        self.graphs.invalidate(&item.author);
        info!(item_id = %item.id, list_id = %item.list_id, author = %item.author, "Track added");
        Ok(item)
    }

    /// Replace the publisher's follow list. Returns the follows as stored.
    pub async fn publish_follow_list(&self, follows: &[Identity]) -> Result<Vec<Identity>> {
        let record = self
            .client
            .publish(follow_list_draft(follows))
            .await
            .map_err(TrustError::Publish)?;
        let stored = parse_follow_set(&record);
        let author = Identity::from(record.pubkey.as_str());

        self.graphs.invalidate(&author);
        self.items
            .invalidate_where(|key| matches!(key, ItemQuery::TrustedRecent { .. }));
        info!(author = %author, follows = stored.len(), "Follow list published");
        Ok(stored)
    }

    async fn cached_items(&self, key: ItemQuery, scope: ItemScope, timeout: Duration) -> Vec<ContentItem> {
        if let Some(items) = self.items.get_fresh(&key) {
            debug!(?key, "Item cache hit");
            return items;
        }
        debug!(?key, "Item cache miss");
        let aggregate = self.aggregator.fetch_items_report(&scope, timeout).await;
        store_if_complete(&self.items, key, aggregate)
    }

    async fn cached_lists(&self, key: ListQuery) -> Vec<ContentList> {
        if let Some(lists) = self.lists.get_fresh(&key) {
            debug!(?key, "List cache hit");
            return lists;
        }
        debug!(?key, "List cache miss");
        let aggregate = self.aggregator.fetch_lists_report(&key).await;
        store_if_complete(&self.lists, key, aggregate)
    }
}

fn store_if_complete<K, T>(cache: &TtlCache<K, Vec<T>>, key: K, aggregate: Aggregate<T>) -> Vec<T>
where
    K: Eq + std::hash::Hash + Clone + std::fmt::Debug,
    T: Clone,
{
    if aggregate.is_complete() {
        cache.insert(key, aggregate.items.clone());
    } else {
        debug!(?key, failed_batches = aggregate.failed_batches, "Partial aggregate, not caching");
    }
    aggregate.items
}
