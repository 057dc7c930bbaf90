//! Web-of-Trust computation.
//!
//! Depth 0 is the viewer's own follow list. Depth 1 is everything those
//! accounts follow, minus depth 0 and minus the viewer. The graph is always
//! recomputed from raw follow lists, never patched in place.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use trustwave_common::kinds::FOLLOW_LIST;
use trustwave_common::{parse_follow_set, Config, Identity};
use trustwave_events::{
    latest_by_author, query_with_deadline, select_authoritative, EventClient, QueryFilter,
};

use crate::batch::{partition, settle_all};
use crate::error::{Result, TrustError};

/// How far from the viewer a trusted identity sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustDepth {
    /// Followed by the viewer.
    Direct,
    /// Followed by someone the viewer follows.
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustGraph {
    pub viewer: Identity,
    pub depth0: BTreeSet<Identity>,
    pub depth1: BTreeSet<Identity>,
    /// `{viewer} ∪ depth0 ∪ depth1`.
    pub all: BTreeSet<Identity>,
    /// Depth-1 batches that failed. Non-zero means `depth1` is partial.
    pub failed_batches: usize,
}

impl TrustGraph {
    /// Graph of a viewer who follows no one.
    pub fn isolated(viewer: Identity) -> Self {
        Self::assemble(viewer, BTreeSet::new(), BTreeSet::new(), 0)
    }

    fn assemble(
        viewer: Identity,
        depth0: BTreeSet<Identity>,
        depth1: BTreeSet<Identity>,
        failed_batches: usize,
    ) -> Self {
        let mut all: BTreeSet<Identity> = depth0.union(&depth1).cloned().collect();
        all.insert(viewer.clone());
        Self {
            viewer,
            depth0,
            depth1,
            all,
            failed_batches,
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.all.contains(identity)
    }

    /// Depth of `identity`, or `None` if untrusted. The viewer has no depth.
    pub fn depth_of(&self, identity: &Identity) -> Option<TrustDepth> {
        if self.depth0.contains(identity) {
            Some(TrustDepth::Direct)
        } else if self.depth1.contains(identity) {
            Some(TrustDepth::Extended)
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed_batches == 0
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct TrustGraphOptions {
    #[builder(default = true)]
    pub expand_depth1: bool,
    #[builder(default = Duration::from_secs(10))]
    pub timeout: Duration,
    #[builder(default = 50)]
    pub batch_size: usize,
}

impl Default for TrustGraphOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&Config> for TrustGraphOptions {
    fn from(config: &Config) -> Self {
        Self::builder()
            .expand_depth1(config.expand_depth1)
            .timeout(config.wot_timeout)
            .batch_size(config.wot_batch_size)
            .build()
    }
}

pub struct TrustGraphBuilder {
    client: Arc<dyn EventClient>,
}

impl TrustGraphBuilder {
    pub fn new(client: Arc<dyn EventClient>) -> Self {
        Self { client }
    }

    /// Declared follows of `identity` from its most recent follow list.
    /// Transport failure propagates: this is the one query with no partial
    /// answer.
    pub async fn follow_set(&self, identity: &Identity, timeout: Duration) -> Result<Vec<Identity>> {
        let filter = QueryFilter::new()
            .kinds([FOLLOW_LIST])
            .authors([identity.as_str()])
            .limit(1);

        let records = query_with_deadline(self.client.as_ref(), &[filter], timeout)
            .await
            .map_err(|source| TrustError::FollowListUnavailable {
                viewer: identity.clone(),
                source,
            })?;

        Ok(select_authoritative(&records)
            .map(parse_follow_set)
            .unwrap_or_default())
    }

    pub async fn build(&self, viewer: &Identity, opts: &TrustGraphOptions) -> Result<TrustGraph> {
        let depth0: BTreeSet<Identity> = self
            .follow_set(viewer, opts.timeout)
            .await?
            .into_iter()
            .collect();

        if depth0.is_empty() {
            debug!(viewer = %viewer, "Viewer follows no one, trust graph is the viewer alone");
            return Ok(TrustGraph::isolated(viewer.clone()));
        }

        if !opts.expand_depth1 {
            let graph = TrustGraph::assemble(viewer.clone(), depth0, BTreeSet::new(), 0);
            info!(viewer = %viewer, depth0 = graph.depth0.len(), "Trust graph computed (depth 0 only)");
            return Ok(graph);
        }

        let sources: Vec<&str> = depth0.iter().map(Identity::as_str).collect();
        let filters: Vec<QueryFilter> = partition(&sources, opts.batch_size)
            .into_iter()
            .map(|batch| {
                let limit = batch.len();
                QueryFilter::new()
                    .kinds([FOLLOW_LIST])
                    .authors(batch)
                    .limit(limit)
            })
            .collect();

        let settled = settle_all(self.client.as_ref(), filters, opts.timeout, "depth-1 follows").await;

        let mut depth1 = BTreeSet::new();
        for record in latest_by_author(&settled.records).into_values() {
            for follow in parse_follow_set(record) {
                if !depth0.contains(&follow) && &follow != viewer {
                    depth1.insert(follow);
                }
            }
        }

        let graph = TrustGraph::assemble(viewer.clone(), depth0, depth1, settled.failed_batches);
        info!(
            viewer = %viewer,
            depth0 = graph.depth0.len(),
            depth1 = graph.depth1.len(),
            batches = settled.batches,
            failed_batches = graph.failed_batches,
            "Trust graph computed"
        );
        Ok(graph)
    }
}
