//! Caching, invalidation, and mode resolution of the feed service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{follow_list, init_tracing, new_list, new_track, playlist, track};
use trustwave_common::kinds::FOLLOW_LIST;
use trustwave_common::{Config, Identity};
use trustwave_events::{EventClient, MemoryClient};
use trustwave_wot::{FeedService, FilterMode, FilterToggle, ManualClock, TrustError};

struct Harness {
    client: Arc<MemoryClient>,
    clock: Arc<ManualClock>,
    service: FeedService,
}

fn harness(client: MemoryClient) -> Harness {
    init_tracing();
    let client = Arc::new(client);
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()));
    let dyn_client: Arc<dyn EventClient> = client.clone();
    let service = FeedService::with_clock(dyn_client, &Config::default(), clock.clone());
    Harness { client, clock, service }
}

fn me() -> Identity {
    Identity::from("me")
}

fn global() -> FilterToggle {
    FilterToggle::new(FilterMode::Global)
}

fn authors(items: &[trustwave_common::ContentItem]) -> Vec<&str> {
    items.iter().map(|i| i.author.as_str()).collect()
}

#[tokio::test]
async fn trust_graph_is_cached_until_it_expires() {
    let h = harness(MemoryClient::new("me").with_record(follow_list("me", 100, &["alice"])));

    let first = h.service.trust_graph(Some(&me())).await.unwrap().unwrap();
    let after_first = h.client.query_count();
    let second = h.service.trust_graph(Some(&me())).await.unwrap().unwrap();
    assert_eq!(h.client.query_count(), after_first);
    assert_eq!(first, second);

    h.clock.advance(Duration::from_secs(301));
    h.service.trust_graph(Some(&me())).await.unwrap();
    assert_eq!(h.client.query_count(), after_first * 2);
}

#[tokio::test]
async fn logged_out_viewer_has_no_graph() {
    let h = harness(MemoryClient::new("me"));
    assert!(h.service.trust_graph(None).await.unwrap().is_none());
    assert_eq!(h.client.query_count(), 0);
}

#[tokio::test]
async fn logged_out_viewer_gets_global_activity() {
    let h = harness(MemoryClient::new("me").with_records([
        track("alice", "l", "https://a", 2),
        track("mallory", "l", "https://m", 1),
    ]));

    let feed = h.service.activity(None, &FilterToggle::default(), 10).await;

    assert_eq!(feed.mode, FilterMode::Global);
    assert_eq!(authors(&feed.items), vec!["alice", "mallory"]);
    let asked_for_follows = h
        .client
        .queries()
        .iter()
        .flatten()
        .any(|f| f.kinds.as_deref() == Some(&[FOLLOW_LIST][..]));
    assert!(!asked_for_follows);
}

#[tokio::test]
async fn following_viewer_gets_trusted_activity() {
    let h = harness(MemoryClient::new("me").with_records([
        follow_list("me", 100, &["alice"]),
        follow_list("alice", 90, &["bob"]),
        track("alice", "l", "https://a", 3),
        track("mallory", "l", "https://m", 2),
        track("bob", "l", "https://b", 1),
    ]));

    let feed = h.service.activity(Some(&me()), &FilterToggle::default(), 10).await;

    assert_eq!(feed.mode, FilterMode::Trusted);
    assert_eq!(authors(&feed.items), vec!["alice", "bob"]);
}

#[tokio::test]
async fn viewer_following_nobody_gets_global_activity() {
    let h = harness(MemoryClient::new("me").with_records([track("mallory", "l", "https://m", 1)]));

    let feed = h.service.activity(Some(&me()), &FilterToggle::default(), 10).await;

    assert_eq!(feed.mode, FilterMode::Global);
    assert_eq!(authors(&feed.items), vec!["mallory"]);
}

#[tokio::test]
async fn unavailable_graph_falls_back_to_global() {
    let h = harness(
        MemoryClient::new("me")
            .with_record(track("mallory", "l", "https://m", 1))
            .fail_for_author("me"),
    );

    let feed = h.service.activity(Some(&me()), &FilterToggle::default(), 10).await;

    assert_eq!(feed.mode, FilterMode::Global);
    assert_eq!(feed.items.len(), 1);
    assert!(matches!(
        h.service.trust_graph(Some(&me())).await,
        Err(TrustError::FollowListUnavailable { .. })
    ));
}

#[tokio::test]
async fn activity_is_cached_for_the_items_ttl() {
    let h = harness(MemoryClient::new("me").with_record(track("alice", "l", "https://a", 1)));

    h.service.activity(None, &global(), 10).await;
    h.service.activity(None, &global(), 10).await;
    assert_eq!(h.client.query_count(), 1);

    h.clock.advance(Duration::from_secs(31));
    h.service.activity(None, &global(), 10).await;
    assert_eq!(h.client.query_count(), 2);
}

#[tokio::test]
async fn trusted_list_feed_hides_untrusted_authors() {
    let h = harness(MemoryClient::new("me").with_records([
        follow_list("me", 100, &["alice"]),
        track("alice", "list-1", "https://a", 2),
        track("mallory", "list-1", "https://m", 1),
    ]));

    let trusted = h.service.list_feed(Some(&me()), "list-1", &FilterToggle::default()).await;
    assert_eq!(trusted.mode, FilterMode::Trusted);
    assert_eq!(authors(&trusted.items), vec!["alice"]);

    let everyone = h.service.list_feed(Some(&me()), "list-1", &global()).await;
    assert_eq!(everyone.mode, FilterMode::Global);
    assert_eq!(authors(&everyone.items), vec!["alice", "mallory"]);
}

#[tokio::test]
async fn adding_a_track_refreshes_dependent_feeds() {
    let h = harness(MemoryClient::new("me").with_record(track("me", "list-1", "https://old", 1)));

    assert_eq!(h.service.list_feed(None, "list-1", &global()).await.items.len(), 1);
    assert_eq!(h.service.author_items(&me()).await.len(), 1);
    assert_eq!(h.service.activity(None, &global(), 10).await.items.len(), 1);

    let added = h.service.add_track(new_track("list-1", "https://new")).await.unwrap();
    assert_eq!(added.author, me());

    let list_feed = h.service.list_feed(None, "list-1", &global()).await;
    assert_eq!(list_feed.items.len(), 2);
    assert_eq!(list_feed.items[0].id, added.id);
    assert_eq!(h.service.author_items(&me()).await.len(), 2);
    assert_eq!(h.service.activity(None, &global(), 10).await.items.len(), 2);
}

#[tokio::test]
async fn publishing_a_follow_list_switches_the_viewer_to_trusted() {
    let h = harness(MemoryClient::new("me").with_record(track("alice", "l", "https://a", 1)));

    let before = h.service.activity(Some(&me()), &FilterToggle::default(), 10).await;
    assert_eq!(before.mode, FilterMode::Global);

    let stored = h
        .service
        .publish_follow_list(&[Identity::from("alice"), Identity::from("alice")])
        .await
        .unwrap();
    assert_eq!(stored, vec![Identity::from("alice")]);

    let after = h.service.activity(Some(&me()), &FilterToggle::default(), 10).await;
    assert_eq!(after.mode, FilterMode::Trusted);
    assert_eq!(authors(&after.items), vec!["alice"]);
}

#[tokio::test]
async fn publishing_a_list_refreshes_list_queries() {
    let h = harness(MemoryClient::new("me").with_record(playlist("alice", "Old", &["jazz"], 1)));

    assert_eq!(h.service.recent_lists(20).await.len(), 1);
    assert_eq!(h.service.lists_by_tag("Jazz").await.len(), 1);

    let published = h.service.publish_list(new_list("New", &["JAZZ"])).await.unwrap();
    assert_eq!(published.tags, vec!["jazz".to_string()]);

    let recent = h.service.recent_lists(20).await;
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].title, "New");
    assert_eq!(h.service.lists_by_tag("jazz").await.len(), 2);
    assert_eq!(h.service.lists_by_author(&me()).await.len(), 1);
    assert_eq!(h.service.list(&published.id).await.unwrap().title, "New");
    assert_eq!(h.service.search_lists("new").await.len(), 1);
}

#[tokio::test]
async fn partial_results_are_not_cached() {
    let h = harness(MemoryClient::new("me").fail_for_author("mallory"));

    assert!(h.service.lists_by_author(&Identity::from("mallory")).await.is_empty());
    assert!(h.service.lists_by_author(&Identity::from("mallory")).await.is_empty());
    assert_eq!(h.client.query_count(), 2);
}

#[tokio::test]
async fn rejected_publish_is_an_error() {
    let h = harness(MemoryClient::new("me").reject_publishes());

    let err = h.service.add_track(new_track("list-1", "https://a")).await.unwrap_err();
    assert!(matches!(err, TrustError::Publish(_)));
}
