use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

use super::{Clock, SystemClock};

/// Default lifetime of a cached collection.
pub const DEFAULT_TTL_SECS: i64 = 300;

pub struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at <= self.ttl
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.stored_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// In-memory key/value cache with per-entry expiry.
///
/// Values of any `Clone + Send + Sync` type can be stored; a lookup with the
/// wrong type is a miss. Expired entries are evicted by the read that finds
/// them. There is no size bound, so it is only suited to the small per-user
/// collections a dashboard shows.
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self::new(default_ttl, Arc::new(SystemClock))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store `value`, replacing whatever was under `key`.
    pub fn set_with_ttl<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        value: T,
        ttl: Duration,
    ) {
        let entry = CacheEntry {
            value: Arc::new(value),
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries.lock().insert(key.into(), entry);
    }

    /// Fresh value under `key`, or `None`. A stale entry is removed.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let fresh = entries.get(key)?.is_fresh(now);
        if !fresh {
            entries.remove(key);
            debug!(key, "Evicted expired cache entry");
            return None;
        }

        let value = entries.get(key)?.value.downcast_ref::<T>().cloned();
        if value.is_none() {
            debug!(key, "Cache entry has a different type");
        }
        value
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(key)
            .map(|e| e.is_fresh(now))
            .unwrap_or(false)
    }

    /// Remove every key containing `pattern`, or everything when `None`.
    /// Returns the number of entries removed.
    pub fn clear(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        match pattern {
            Some(pattern) => entries.retain(|key, _| !key.contains(pattern)),
            None => entries.clear(),
        }
        let removed = before - entries.len();
        debug!(?pattern, removed, "Cache cleared");
        removed
    }

    /// Human age of a fresh entry ("5m ago"), for status lines.
    pub fn age_display(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(key)
            .filter(|e| e.is_fresh(now))
            .map(|e| e.age_display(now))
    }

    /// Drop all expired entries at once.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::with_default_ttl(Duration::seconds(DEFAULT_TTL_SECS))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn cache_with_clock() -> (TtlCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::new(Duration::minutes(5), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_set_then_get() {
        let (cache, _) = cache_with_clock();
        cache.set("fees_s1", vec![1, 2, 3]);
        assert_eq!(cache.get::<Vec<i32>>("fees_s1"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_get_after_ttl_is_miss_and_evicts() {
        let (cache, clock) = cache_with_clock();
        cache.set("fees_s1", 42u32);

        clock.advance(Duration::minutes(5));
        assert_eq!(cache.get::<u32>("fees_s1"), Some(42), "boundary is inclusive");

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get::<u32>("fees_s1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites_and_resets_timestamp() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "old".to_string());
        clock.advance(Duration::minutes(4));
        cache.set("k", "new".to_string());
        clock.advance(Duration::minutes(4));
        assert_eq!(cache.get::<String>("k").as_deref(), Some("new"));
    }

    #[test]
    fn test_custom_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set_with_ttl("short", 1u8, Duration::seconds(10));
        clock.advance(Duration::seconds(11));
        assert!(!cache.contains("short"));
        assert_eq!(cache.get::<u8>("short"), None);
    }

    #[test]
    fn test_wrong_type_is_miss() {
        let (cache, _) = cache_with_clock();
        cache.set("k", 1u32);
        assert_eq!(cache.get::<String>("k"), None);
        assert_eq!(cache.get::<u32>("k"), Some(1));
    }

    #[test]
    fn test_get_missing_key() {
        let (cache, _) = cache_with_clock();
        assert_eq!(cache.get::<u32>("nothing"), None);
    }

    #[test]
    fn test_clear_by_pattern() {
        let (cache, _) = cache_with_clock();
        cache.set("parent_fees_s1", 1u32);
        cache.set("parent_attendance_s1", 2u32);
        cache.set("profile_u1", 3u32);

        assert_eq!(cache.clear(Some("parent_")), 2);
        assert!(!cache.contains("parent_fees_s1"));
        assert!(cache.contains("profile_u1"));

        assert_eq!(cache.clear(None), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_with_clock();
        cache.set_with_ttl("a", 1u8, Duration::seconds(1));
        cache.set("b", 2u8);
        clock.advance(Duration::seconds(2));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_age_display() {
        let (cache, clock) = cache_with_clock();
        cache.set_with_ttl("k", 1u8, Duration::days(10));
        assert_eq!(cache.age_display("k").as_deref(), Some("just now"));
        clock.advance(Duration::minutes(5));
        assert_eq!(cache.age_display("k").as_deref(), Some("5m ago"));
        clock.advance(Duration::minutes(85));
        assert_eq!(cache.age_display("k").as_deref(), Some("2h ago"));
        clock.advance(Duration::days(2));
        assert_eq!(cache.age_display("k").as_deref(), Some("2d ago"));
        assert_eq!(cache.age_display("missing"), None);
    }
}
