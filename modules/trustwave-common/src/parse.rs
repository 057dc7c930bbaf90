//! Record → domain normalization.
//!
//! Parsers are filters: a record of the wrong kind or missing a required tag
//! yields `None` and is dropped by the caller. Nothing here returns an error.

use std::collections::HashSet;

use trustwave_events::EventRecord;

use crate::identity::Identity;
use crate::kinds::{
    FOLLOW_LIST, LIST_ITEM_KINDS, LIST_KINDS, TAG_FOLLOW, TAG_LIST_REF, TAG_MEDIA_URL, TAG_TOPIC,
};
use crate::types::{ContentItem, ContentList};

pub const DEFAULT_LIST_TITLE: &str = "Untitled";
pub const DEFAULT_TRACK_TITLE: &str = "Unknown Track";
pub const DEFAULT_ARTIST: &str = "Unknown Artist";

fn optional(record: &EventRecord, name: &str) -> Option<String> {
    record.tags.first_value(name).map(str::to_string)
}

/// Order-preserving dedup; the first occurrence wins.
pub fn ordered_set<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

pub fn parse_list(record: &EventRecord) -> Option<ContentList> {
    if !LIST_KINDS.contains(&record.kind) {
        return None;
    }

    let title = record
        .tags
        .first_value("title")
        .or_else(|| record.tags.first_value("names"))
        .unwrap_or(DEFAULT_LIST_TITLE)
        .to_string();

    Some(ContentList {
        id: record.id.clone(),
        author: Identity::from(record.pubkey.as_str()),
        title,
        description: optional(record, "description").unwrap_or_default(),
        image: optional(record, "image"),
        tags: ordered_set(record.tags.all_values(TAG_TOPIC)),
        created_at: record.created_at,
    })
}

pub fn parse_item(record: &EventRecord) -> Option<ContentItem> {
    if !LIST_ITEM_KINDS.contains(&record.kind) {
        return None;
    }

    let list_id = record.tags.first_value(TAG_LIST_REF)?;
    let media_url = record.tags.first_value(TAG_MEDIA_URL)?;

    Some(ContentItem {
        id: record.id.clone(),
        author: Identity::from(record.pubkey.as_str()),
        list_id: list_id.to_string(),
        media_url: media_url.to_string(),
        title: optional(record, "title").unwrap_or_else(|| DEFAULT_TRACK_TITLE.to_string()),
        artist: optional(record, "artist").unwrap_or_else(|| DEFAULT_ARTIST.to_string()),
        annotation: optional(record, "annotation"),
        guid: optional(record, "guid"),
        feed_url: optional(record, "feed"),
        value_tag: optional(record, "value"),
        artwork_url: optional(record, "artwork"),
        duration_secs: record
            .tags
            .first_value("duration")
            .and_then(|d| d.trim().parse::<u32>().ok())
            .filter(|d| *d > 0),
        created_at: record.created_at,
    })
}

/// Declared follows of a follow-list record, in declaration order without
/// duplicates. A record of any other kind declares nothing.
pub fn parse_follow_set(record: &EventRecord) -> Vec<Identity> {
    if record.kind != FOLLOW_LIST {
        return Vec::new();
    }
    ordered_set(record.tags.all_values(TAG_FOLLOW))
        .into_iter()
        .map(Identity::from)
        .collect()
}
