//! Event kinds this application reads and writes.
//!
//! Lists and list items each come in a regular and a replaceable variant.
//! Readers treat both variants of a pair identically.

/// Follow list. Replaceable: only the latest per author counts.
pub const FOLLOW_LIST: u16 = 3;

/// Playlist.
pub const LIST: u16 = 9998;
pub const LIST_REPLACEABLE: u16 = 39998;

/// Track added to a playlist.
pub const LIST_ITEM: u16 = 9999;
pub const LIST_ITEM_REPLACEABLE: u16 = 39999;

pub const LIST_KINDS: [u16; 2] = [LIST, LIST_REPLACEABLE];
pub const LIST_ITEM_KINDS: [u16; 2] = [LIST_ITEM, LIST_ITEM_REPLACEABLE];

// Tag names.
pub const TAG_FOLLOW: &str = "p";
pub const TAG_LIST_REF: &str = "z";
pub const TAG_MEDIA_URL: &str = "r";
pub const TAG_TOPIC: &str = "t";
