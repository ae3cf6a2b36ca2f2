//! 题目 → 远程页面的本地缓存
//!
//! 条目以 `problem_{number}` 为键，超过 TTL（1 小时）即视为不存在并被删除。
//! 只有“完全有效”和“不存在”两种结果。

use super::store::Store;
use crate::error::SyncError;
use crate::models::{cache_key, CacheEntry, PageRef};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

pub const CACHE_KEY_PREFIX: &str = "problem_";

pub fn cache_ttl() -> Duration {
    Duration::hours(1)
}

#[derive(Clone)]
pub struct VolatileCache {
    store: Store,
    ttl: Duration,
}

impl VolatileCache {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            ttl: cache_ttl(),
        }
    }

    pub fn get(&self, number: u32) -> Option<CacheEntry> {
        self.get_at(number, Utc::now())
    }

    /// 过期条目在读取时删除；存储故障按未命中处理
    pub fn get_at(&self, number: u32, now: DateTime<Utc>) -> Option<CacheEntry> {
        let key = cache_key(number);
        let entry = match self.store.get::<CacheEntry>(&key) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("Cache read for {} failed: {}", key, e);
                return None;
            }
        };

        if now - entry.timestamp > self.ttl {
            debug!("Cache entry {} expired", key);
            self.invalidate(number);
            return None;
        }

        Some(entry)
    }

    pub fn put(&self, number: u32, entry: &CacheEntry) -> Result<(), SyncError> {
        self.store.put(&cache_key(number), entry)
    }

    /// 以当前时间写入远程页面
    pub fn put_page(&self, number: u32, page: &PageRef) -> Result<CacheEntry, SyncError> {
        let entry = CacheEntry {
            page_id: page.id.clone(),
            page_url: page.url.clone(),
            timestamp: Utc::now(),
        };
        self.put(number, &entry)?;
        Ok(entry)
    }

    pub fn invalidate(&self, number: u32) {
        if let Err(e) = self.store.remove(&cache_key(number)) {
            warn!("Failed to invalidate cache entry for problem {}: {}", number, e);
        }
    }

    /// 清理所有过期条目，返回删除数量
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SyncError> {
        let mut removed = 0;
        for key in self.store.keys_with_prefix(CACHE_KEY_PREFIX)? {
            let expired = match self.store.get::<CacheEntry>(&key) {
                Ok(Some(entry)) => now - entry.timestamp > self.ttl,
                Ok(None) => false,
                // 无法解析的旧条目一并清掉
                Err(_) => true,
            };
            if expired && self.store.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(id: &str, timestamp: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            page_id: id.to_string(),
            page_url: format!("https://www.notion.so/{}", id),
            timestamp,
        }
    }

    #[test]
    fn test_expired_entry_is_absent_and_removed() {
        let store = Store::open_in_memory().unwrap();
        let cache = VolatileCache::new(store.clone());
        let now = Utc::now();

        cache.put(42, &entry("abc", now - Duration::minutes(61))).unwrap();

        assert_eq!(cache.get_at(42, now), None);
        assert!(!store.contains("problem_42").unwrap());
        // 第二次读取同样为空，不会因为重复删除报错
        assert_eq!(cache.get_at(42, now), None);
    }

    #[test]
    fn test_entry_within_ttl_is_returned() {
        let cache = VolatileCache::new(Store::open_in_memory().unwrap());
        let now = Utc::now();
        let fresh = entry("abc", now - Duration::minutes(59));
        cache.put(7, &fresh).unwrap();
        assert_eq!(cache.get_at(7, now), Some(fresh));
    }

    #[test]
    fn test_invalidate_missing_entry_is_noop() {
        let cache = VolatileCache::new(Store::open_in_memory().unwrap());
        cache.invalidate(99);
        assert_eq!(cache.get(99), None);
    }

    #[test]
    fn test_purge_expired() {
        let store = Store::open_in_memory().unwrap();
        let cache = VolatileCache::new(store.clone());
        let now = Utc::now();
        cache.put(1, &entry("old", now - Duration::hours(2))).unwrap();
        cache.put(2, &entry("new", now)).unwrap();
        store.put_raw("problem_3", "not json").unwrap();

        assert_eq!(cache.purge_expired(now).unwrap(), 2);
        assert!(cache.get_at(2, now).is_some());
    }

    proptest! {
        #[test]
        fn prop_cache_round_trip(number in 1u32..5000, id in "[a-f0-9]{32}") {
            let cache = VolatileCache::new(Store::open_in_memory().unwrap());
            let page = PageRef {
                id: id.clone(),
                url: format!("https://www.notion.so/{}", id),
                archived: false,
                in_trash: false,
            };
            cache.put_page(number, &page).unwrap();

            let read = cache.get(number).unwrap();
            prop_assert_eq!(read.page_id, page.id);
            prop_assert_eq!(read.page_url, page.url);
        }
    }
}
