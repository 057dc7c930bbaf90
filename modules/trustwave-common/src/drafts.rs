//! Domain → draft. The inverse of `parse`, for the events this application
//! publishes.

use trustwave_events::{EventDraft, Tags};

use crate::identity::Identity;
use crate::kinds::{FOLLOW_LIST, LIST, LIST_ITEM, TAG_FOLLOW, TAG_LIST_REF, TAG_MEDIA_URL, TAG_TOPIC};
use crate::parse::ordered_set;
use crate::types::{ContentList, NewList, NewTrack};

fn list_tags(title: &str, description: &str, image: Option<&str>, topics: &[String]) -> Tags {
    let mut tags = Tags::new()
        .with(["names", "playlist", "playlists"])
        .with(["title", title])
        .with(["description", description])
        .with(["required", TAG_MEDIA_URL])
        .with(["recommended", "title", "artist", "annotation"])
        .with(["alt".to_string(), format!("Music playlist: {title}")]);

    if let Some(image) = image {
        tags.push(["image", image]);
    }
    for topic in topics {
        tags.push([TAG_TOPIC, topic.as_str()]);
    }
    tags
}

impl NewList {
    /// Topic tags are lowercased and deduplicated.
    pub fn into_draft(self) -> EventDraft {
        let lowered: Vec<String> = self.tags.iter().map(|t| t.to_lowercase()).collect();
        let topics = ordered_set(lowered.iter().map(String::as_str).filter(|t| !t.is_empty()));
        EventDraft::new(LIST).with_tags(list_tags(
            &self.title,
            &self.description,
            self.image.as_deref(),
            &topics,
        ))
    }
}

impl ContentList {
    /// Re-emit this list in the layout `NewList::into_draft` produces.
    /// `parse_list` of the resulting record reproduces every field but `id`
    /// and `created_at`, which the publisher assigns.
    pub fn to_draft(&self) -> EventDraft {
        EventDraft::new(LIST).with_tags(list_tags(
            &self.title,
            &self.description,
            self.image.as_deref(),
            &self.tags,
        ))
    }
}

impl NewTrack {
    pub fn into_draft(self) -> EventDraft {
        let track = self.track;
        let mut tags = Tags::new()
            .with([TAG_LIST_REF, self.list_id.as_str()])
            .with([TAG_MEDIA_URL, track.media_url.as_str()])
            .with(["title", track.title.as_str()])
            .with(["artist", track.artist.as_str()])
            .with([
                "alt".to_string(),
                format!("Added \"{}\" by {} to playlist", track.title, track.artist),
            ]);

        let optional = [
            ("annotation", self.annotation),
            ("guid", track.guid),
            ("feed", track.feed_url),
            ("value", track.value_tag),
            ("artwork", track.artwork_url),
            ("duration", track.duration_secs.map(|d| d.to_string())),
        ];
        for (name, value) in optional {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                tags.push([name.to_string(), value]);
            }
        }

        EventDraft::new(LIST_ITEM).with_tags(tags)
    }
}

/// A follow list declaring exactly `follows`, duplicates removed.
pub fn follow_list_draft<'a>(follows: impl IntoIterator<Item = &'a Identity>) -> EventDraft {
    let tags = ordered_set(follows.into_iter().map(Identity::as_str))
        .into_iter()
        .fold(Tags::new(), |tags, id| tags.with([TAG_FOLLOW.to_string(), id]));
    EventDraft::new(FOLLOW_LIST).with_tags(tags)
}
