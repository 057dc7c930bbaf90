use serde::{Deserialize, Serialize};

use trustwave_common::{ContentItem, ContentList, Identity};

use crate::graph::TrustGraph;

/// Anything attributable to a single author.
pub trait Authored {
    fn author(&self) -> &Identity;
}

impl Authored for ContentItem {
    fn author(&self) -> &Identity {
        &self.author
    }
}

impl Authored for ContentList {
    fn author(&self) -> &Identity {
        &self.author
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Global,
    Trusted,
}

/// Keep the items `mode` admits. `Global` passes everything through;
/// `Trusted` keeps items whose author is in `graph.all`. Order is preserved.
pub fn apply_filter<T: Authored>(items: Vec<T>, graph: &TrustGraph, mode: FilterMode) -> Vec<T> {
    match mode {
        FilterMode::Global => items,
        FilterMode::Trusted => items
            .into_iter()
            .filter(|item| graph.contains(item.author()))
            .collect(),
    }
}

/// The mode actually served. Trusted needs a logged-in viewer, a graph built
/// for that viewer, and at least one direct follow; anything short of that is
/// Global.
pub fn effective_mode(
    viewer: Option<&Identity>,
    graph: Option<&TrustGraph>,
    requested: FilterMode,
) -> FilterMode {
    match (requested, viewer, graph) {
        (FilterMode::Trusted, Some(viewer), Some(graph))
            if graph.viewer == *viewer && !graph.depth0.is_empty() =>
        {
            FilterMode::Trusted
        }
        _ => FilterMode::Global,
    }
}

/// A user's Global/Trusted preference.
///
/// The preference survives falling back to Global: a logged-out viewer who
/// prefers Trusted gets Global now and Trusted again once they log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterToggle {
    preference: FilterMode,
}

impl Default for FilterToggle {
    fn default() -> Self {
        Self {
            preference: FilterMode::Trusted,
        }
    }
}

impl FilterToggle {
    pub fn new(preference: FilterMode) -> Self {
        Self { preference }
    }

    pub fn preference(&self) -> FilterMode {
        self.preference
    }

    pub fn select(&mut self, mode: FilterMode) {
        self.preference = mode;
    }

    pub fn toggle(&mut self) -> FilterMode {
        self.preference = match self.preference {
            FilterMode::Global => FilterMode::Trusted,
            FilterMode::Trusted => FilterMode::Global,
        };
        self.preference
    }

    pub fn effective(&self, viewer: Option<&Identity>, graph: Option<&TrustGraph>) -> FilterMode {
        effective_mode(viewer, graph, self.preference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct Post {
        id: u32,
        author: Identity,
    }

    impl Authored for Post {
        fn author(&self) -> &Identity {
            &self.author
        }
    }

    fn post(id: u32, author: &str) -> Post {
        Post {
            id,
            author: Identity::from(author),
        }
    }

    fn set(raw: &[&str]) -> BTreeSet<Identity> {
        raw.iter().map(|s| Identity::from(*s)).collect()
    }

    fn graph(viewer: &str, depth0: &[&str], depth1: &[&str]) -> TrustGraph {
        let mut all: BTreeSet<Identity> = set(depth0).union(&set(depth1)).cloned().collect();
        all.insert(Identity::from(viewer));
        TrustGraph {
            viewer: Identity::from(viewer),
            depth0: set(depth0),
            depth1: set(depth1),
            all,
            failed_batches: 0,
        }
    }

    #[test]
    fn trusted_keeps_viewer_direct_and_extended_authors() {
        let g = graph("me", &["alice"], &["bob"]);
        let items = vec![post(1, "alice"), post(2, "mallory"), post(3, "bob"), post(4, "me")];

        let kept: Vec<u32> = apply_filter(items, &g, FilterMode::Trusted)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(kept, vec![1, 3, 4]);
    }

    #[test]
    fn trusted_filter_of_nothing_is_nothing() {
        let g = graph("me", &["alice"], &["bob"]);
        assert!(apply_filter(Vec::<Post>::new(), &g, FilterMode::Trusted).is_empty());
    }

    #[test]
    fn global_is_identity() {
        let g = graph("me", &["alice"], &[]);
        let items = vec![post(2, "mallory"), post(1, "alice")];
        let kept: Vec<u32> = apply_filter(items, &g, FilterMode::Global)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(kept, vec![2, 1]);
    }

    #[test]
    fn trusted_requires_viewer_graph_and_follows() {
        let me = Identity::from("me");
        let someone_else = Identity::from("other");
        let full = graph("me", &["alice"], &[]);
        let lonely = graph("me", &[], &[]);

        assert_eq!(effective_mode(Some(&me), Some(&full), FilterMode::Trusted), FilterMode::Trusted);
        assert_eq!(effective_mode(None, Some(&full), FilterMode::Trusted), FilterMode::Global);
        assert_eq!(effective_mode(Some(&me), None, FilterMode::Trusted), FilterMode::Global);
        assert_eq!(effective_mode(Some(&me), Some(&lonely), FilterMode::Trusted), FilterMode::Global);
        assert_eq!(
            effective_mode(Some(&someone_else), Some(&full), FilterMode::Trusted),
            FilterMode::Global
        );
        assert_eq!(effective_mode(Some(&me), Some(&full), FilterMode::Global), FilterMode::Global);
    }

    #[test]
    fn logged_out_viewer_falls_back_without_losing_preference() {
        let toggle = FilterToggle::default();
        assert_eq!(toggle.preference(), FilterMode::Trusted);
        assert_eq!(toggle.effective(None, None), FilterMode::Global);

        let me = Identity::from("me");
        let g = graph("me", &["alice"], &[]);
        assert_eq!(toggle.effective(Some(&me), Some(&g)), FilterMode::Trusted);
    }

    #[test]
    fn toggle_flips_preference() {
        let mut toggle = FilterToggle::default();
        assert_eq!(toggle.toggle(), FilterMode::Global);
        assert_eq!(toggle.toggle(), FilterMode::Trusted);
        toggle.select(FilterMode::Global);
        assert_eq!(toggle.preference(), FilterMode::Global);
    }
}
