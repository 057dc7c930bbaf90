use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

/// Source of "now" for staleness checks. Injected so tests control expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(any(test, feature = "test-utils"))]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    computed_at: DateTime<Utc>,
}

/// Key → {value, computed_at} map with a freshness window.
///
/// The map lives behind an `ArcSwap` and every write swaps in a new copy, so
/// readers always see a consistent snapshot and an entry is only ever
/// replaced whole. Concurrent writers resolve last-writer-wins.
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: ArcSwap<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if it was computed less than `ttl` ago.
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        let snapshot = self.entries.load();
        let entry = snapshot.get(key)?;
        self.is_fresh(entry, self.clock.now())
            .then(|| entry.value.clone())
    }

    // A clock that moved backwards counts as fresh.
    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        (now - entry.computed_at)
            .to_std()
            .map_or(true, |age| age < self.ttl)
    }

    /// Store `value` under `key`. Expired entries are dropped in the same
    /// swap.
    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            computed_at: now,
        };
        self.entries.rcu(|current| {
            let mut next: HashMap<K, CacheEntry<V>> = current
                .iter()
                .filter(|(_, e)| self.is_fresh(e, now))
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect();
            next.insert(key.clone(), entry.clone());
            next
        });
    }

    pub fn invalidate(&self, key: &K) {
        self.invalidate_where(|k| k == key);
    }

    pub fn invalidate_where(&self, mut predicate: impl FnMut(&K) -> bool) {
        self.entries.rcu(|current| {
            current
                .iter()
                .filter(|(k, _)| !predicate(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>()
        });
    }

    pub fn clear(&self) {
        self.entries.store(Arc::new(HashMap::new()));
    }

    /// Number of entries held. Entries that expired since the last insert
    /// are still counted.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()))
    }

    #[test]
    fn entry_expires_after_ttl() {
        let clock = clock();
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(300), clock.clone());
        cache.insert("alice", 7);

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get_fresh(&"alice"), Some(7));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get_fresh(&"alice"), None);
    }

    #[test]
    fn insert_prunes_expired_entries() {
        let clock = clock();
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(30), clock.clone());
        for key in 0..1000 {
            cache.insert(key, key);
            clock.advance(Duration::from_secs(60));
        }
        assert_eq!(cache.len(), 1);

        cache.insert(5000, 1);
        clock.advance(Duration::from_secs(10));
        cache.insert(5001, 2);
        assert_eq!(cache.len(), 2, "fresh entries survive the prune");
        assert_eq!(cache.get_fresh(&5000), Some(1));
    }

    #[test]
    fn insert_replaces_whole_entry_and_resets_age() {
        let clock = clock();
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(10), clock.clone());
        cache.insert("alice", 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("alice", 2);
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get_fresh(&"alice"), Some(2));
    }

    #[test]
    fn invalidate_where_removes_matching_keys_only() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(10), clock());
        cache.insert("recent:20".into(), 1);
        cache.insert("recent:50".into(), 2);
        cache.insert("list:abc".into(), 3);

        cache.invalidate_where(|k| k.starts_with("recent:"));
        assert_eq!(cache.get_fresh(&"list:abc".to_string()), Some(3));
        assert_eq!(cache.get_fresh(&"recent:20".to_string()), None);
        assert_eq!(cache.len(), 1);

        cache.invalidate(&"list:abc".to_string());
        assert!(cache.is_empty());
    }
}
