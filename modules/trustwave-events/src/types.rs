//! Core types for the event client. Domain-agnostic.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Ordered multimap over an event's tag arrays.
///
/// A tag is `[name, value, extra...]`. Lookups are first-match: the first tag
/// carrying `name` answers, later duplicates are only visible through
/// `all_values`. Unknown tags are carried but never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Vec<String>>);

impl Tags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push<I, S>(&mut self, tag: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.push(tag.into_iter().map(Into::into).collect());
    }

    pub fn with<I, S>(mut self, tag: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(tag);
        self
    }

    /// The first tag named `name`, whole.
    pub fn first(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(name))
            .map(Vec::as_slice)
    }

    /// Value of the first tag named `name`. An empty or missing value on that
    /// first tag yields `None`; later tags with the same name are not consulted.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.first(name)
            .and_then(|tag| tag.get(1))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Non-empty values of every tag named `name`, in tag order.
    pub fn all_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |tag| tag.first().map(String::as_str) == Some(name))
            .filter_map(|tag| tag.get(1))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[String]> {
        self.0.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Vec<String>>> for Tags {
    fn from(tags: Vec<Vec<String>>) -> Self {
        Self(tags)
    }
}

/// A signed event as returned by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub pubkey: String,
    pub kind: u16,
    /// Unix seconds.
    pub created_at: i64,
    pub tags: Tags,
    pub content: String,
}

impl EventRecord {
    /// Parameterized-replaceable kinds (30000..40000) are identified by
    /// `(kind, pubkey, d-tag)` rather than by id.
    pub fn is_replaceable(&self) -> bool {
        (30000..40000).contains(&self.kind)
    }

    /// Replaceable coordinate, or `None` for regular events.
    pub fn coordinate(&self) -> Option<(u16, &str, &str)> {
        if !self.is_replaceable() {
            return None;
        }
        let d = self.tags.first_value("d").unwrap_or("");
        Some((self.kind, self.pubkey.as_str(), d))
    }
}

/// An unsigned event to publish. The client signs it and assigns id/author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub kind: u16,
    pub content: String,
    pub tags: Tags,
}

impl EventDraft {
    pub fn new(kind: u16) -> Self {
        Self {
            kind,
            content: String::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Materialize the draft as a record authored by `pubkey` at `created_at`.
    /// The id is the lowercase hex SHA-256 of the canonical serialization
    /// `[0, pubkey, created_at, kind, tags, content]`.
    pub fn into_record(self, pubkey: impl Into<String>, created_at: i64) -> EventRecord {
        let pubkey = pubkey.into();
        let canonical = serde_json::json!([0, pubkey, created_at, self.kind, self.tags, self.content]);
        let id = hex::encode(Sha256::digest(canonical.to_string().as_bytes()));

        EventRecord {
            id,
            pubkey,
            kind: self.kind,
            created_at,
            tags: self.tags,
            content: self.content,
        }
    }
}

/// One filter of a query. All present fields must match (AND); a query with
/// several filters returns the union of their matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub kinds: Option<Vec<u16>>,
    pub authors: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    /// Single-letter tag name → accepted values (wire form `"#z"`).
    pub tags: BTreeMap<String, Vec<String>>,
    pub limit: Option<usize>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u16>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn tag<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `record` satisfies every constraint except `limit`.
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&record.kind) {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            if !authors.iter().any(|a| a == &record.pubkey) {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &record.id) {
                return false;
            }
        }
        self.tags.iter().all(|(name, accepted)| {
            record
                .tags
                .iter()
                .filter(|tag| tag.first() == Some(name))
                .filter_map(|tag| tag.get(1))
                .any(|value| accepted.contains(value))
        })
    }
}

impl Serialize for QueryFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(ids) = &self.ids {
            map.serialize_entry("ids", ids)?;
        }
        if let Some(authors) = &self.authors {
            map.serialize_entry("authors", authors)?;
        }
        if let Some(kinds) = &self.kinds {
            map.serialize_entry("kinds", kinds)?;
        }
        for (name, values) in &self.tags {
            map.serialize_entry(&format!("#{name}"), values)?;
        }
        if let Some(limit) = self.limit {
            map.serialize_entry("limit", &limit)?;
        }
        map.end()
    }
}
