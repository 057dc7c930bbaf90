use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// A playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentList {
    pub id: String,
    pub author: Identity,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    /// Topic tags in declaration order, without duplicates.
    pub tags: Vec<String>,
    pub created_at: i64,
}

/// A track added to a playlist. References exactly one list by `list_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub author: Identity,
    pub list_id: String,
    pub media_url: String,
    pub title: String,
    pub artist: String,
    pub annotation: Option<String>,
    pub guid: Option<String>,
    pub feed_url: Option<String>,
    /// Value-routing metadata. Opaque JSON string, never interpreted here.
    pub value_tag: Option<String>,
    pub artwork_url: Option<String>,
    pub duration_secs: Option<u32>,
    pub created_at: i64,
}

/// Input for creating a playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewList {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
}

/// Track metadata as resolved from a feed or search result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRef {
    pub media_url: String,
    pub title: String,
    pub artist: String,
    pub guid: Option<String>,
    pub feed_url: Option<String>,
    pub value_tag: Option<String>,
    pub artwork_url: Option<String>,
    pub duration_secs: Option<u32>,
}

/// Input for adding a track to a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrack {
    pub list_id: String,
    pub track: TrackRef,
    pub annotation: Option<String>,
}
