#![allow(dead_code)]

use std::collections::BTreeSet;

use trustwave_common::{follow_list_draft, Identity, NewList, NewTrack, TrackRef};
use trustwave_events::EventRecord;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ids(raw: &[&str]) -> BTreeSet<Identity> {
    raw.iter().map(|s| Identity::from(*s)).collect()
}

pub fn follow_list(author: &str, created_at: i64, follows: &[&str]) -> EventRecord {
    let follows: Vec<Identity> = follows.iter().map(|f| Identity::from(*f)).collect();
    follow_list_draft(&follows).into_record(author, created_at)
}

pub fn track(author: &str, list_id: &str, media_url: &str, created_at: i64) -> EventRecord {
    new_track(list_id, media_url)
        .into_draft()
        .into_record(author, created_at)
}

pub fn new_track(list_id: &str, media_url: &str) -> NewTrack {
    NewTrack {
        list_id: list_id.into(),
        track: TrackRef {
            media_url: media_url.into(),
            title: format!("Track at {media_url}"),
            artist: "Someone".into(),
            ..TrackRef::default()
        },
        annotation: None,
    }
}

pub fn new_list(title: &str, topics: &[&str]) -> NewList {
    NewList {
        title: title.into(),
        description: format!("{title} description"),
        image: None,
        tags: topics.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn playlist(author: &str, title: &str, topics: &[&str], created_at: i64) -> EventRecord {
    new_list(title, topics)
        .into_draft()
        .into_record(author, created_at)
}
