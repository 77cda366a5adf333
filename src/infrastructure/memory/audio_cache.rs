//! In-Memory LRU Audio Cache Implementation
//!
//! DashMap 分片加锁，不同 key 的读写互不阻塞；
//! 字节数与命中统计使用原子计数

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{
    AudioCachePort, CacheEntry, CacheError, CacheStats, CachedAudio, TtlPolicy,
};
use crate::domain::synthesis::CacheTier;

/// 默认容量 512MB
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 512 * 1024 * 1024;

struct StoredEntry {
    entry: CacheEntry,
    /// 单调递增的访问序号（LRU）
    last_accessed: AtomicU64,
}

/// 内存音频缓存
pub struct InMemoryAudioCache {
    entries: DashMap<String, StoredEntry>,
    ttl: Arc<TtlPolicy>,
    max_size_bytes: u64,
    current_size: AtomicU64,
    access_tick: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    expired_count: AtomicU64,
}

impl InMemoryAudioCache {
    pub fn new(max_size_bytes: u64, ttl: Arc<TtlPolicy>) -> Self {
        tracing::info!(max_size_bytes, "InMemoryAudioCache initialized");
        Self {
            entries: DashMap::new(),
            ttl,
            max_size_bytes,
            current_size: AtomicU64::new(0),
            access_tick: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn next_tick(&self) -> u64 {
        self.access_tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 超出容量时按最久未访问淘汰，刚写入的 key 不参与
    fn enforce_capacity(&self, keep: &str) {
        while self.current_size.load(Ordering::Relaxed) > self.max_size_bytes {
            let victim = self
                .entries
                .iter()
                .filter(|item| item.key() != keep)
                .min_by_key(|item| item.value().last_accessed.load(Ordering::Relaxed))
                .map(|item| item.key().clone());

            let Some(victim) = victim else { break };
            if let Some((key, stored)) = self.entries.remove(&victim) {
                self.current_size
                    .fetch_sub(stored.entry.size_bytes, Ordering::Relaxed);
                self.eviction_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    key = %key,
                    size_bytes = stored.entry.size_bytes,
                    "LRU evicted cache entry"
                );
            }
        }
    }
}

#[async_trait]
impl AudioCachePort for InMemoryAudioCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = Utc::now();

        if let Some(stored) = self.entries.get(key) {
            if !stored.entry.is_expired_at(now) {
                stored.last_accessed.store(self.next_tick(), Ordering::Relaxed);
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(stored.entry.clone()));
            }
        }

        // 过期条目同步删除
        if let Some((_, stored)) = self
            .entries
            .remove_if(key, |_, stored| stored.entry.is_expired_at(now))
        {
            self.current_size
                .fetch_sub(stored.entry.size_bytes, Ordering::Relaxed);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, tier = %stored.entry.tier, "Expired cache entry removed on access");
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn put(&self, key: &str, audio: CachedAudio, tier: CacheTier) -> Result<(), CacheError> {
        let size_bytes = audio.audio.len() as u64;
        if size_bytes > self.max_size_bytes {
            return Err(CacheError::EntryTooLarge {
                size_bytes,
                capacity_bytes: self.max_size_bytes,
            });
        }

        let now = Utc::now();
        let stored = StoredEntry {
            entry: CacheEntry {
                key: key.to_string(),
                audio,
                size_bytes,
                created_at: now,
                expires_at: self.ttl.expiry_from(now, tier),
                tier,
            },
            last_accessed: AtomicU64::new(self.next_tick()),
        };

        if let Some(previous) = self.entries.insert(key.to_string(), stored) {
            self.current_size
                .fetch_sub(previous.entry.size_bytes, Ordering::Relaxed);
        }
        self.current_size.fetch_add(size_bytes, Ordering::Relaxed);
        self.enforce_capacity(key);

        tracing::debug!(
            key = %key,
            size_bytes,
            tier = %tier,
            "Audio cached"
        );
        Ok(())
    }

    async fn evict_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut removed = 0usize;
        let mut freed = 0u64;

        self.entries.retain(|_, stored| {
            if stored.entry.is_expired_at(now) {
                removed += 1;
                freed += stored.entry.size_bytes;
                false
            } else {
                true
            }
        });

        self.current_size.fetch_sub(freed, Ordering::Relaxed);
        self.expired_count
            .fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        if let Some((_, stored)) = self.entries.remove(key) {
            self.current_size
                .fetch_sub(stored.entry.size_bytes, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
            expired_count: self.expired_count.load(Ordering::Relaxed),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TierTtlTable;
    use crate::domain::synthesis::AudioCodec;
    use bytes::Bytes;
    use std::time::Duration;

    fn audio(bytes: &'static [u8]) -> CachedAudio {
        CachedAudio {
            audio: Bytes::from_static(bytes),
            codec: AudioCodec::Wav,
            sample_rate_hz: 22050,
            provider: "sarvam".to_string(),
            native_voice_id: "anushka".to_string(),
        }
    }

    fn cache(max_size_bytes: u64) -> InMemoryAudioCache {
        InMemoryAudioCache::new(max_size_bytes, Arc::new(TtlPolicy::default()))
    }

    #[tokio::test]
    async fn test_cache_put_get() {
        let cache = cache(1024);
        cache.put("k", audio(b"RIFF-data"), CacheTier::Balanced).await.unwrap();

        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(&entry.audio.audio[..], b"RIFF-data");
        assert_eq!(entry.tier, CacheTier::Balanced);
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(900));
        assert_eq!(entry.mime_type(), "audio/wav");

        assert!(cache.get("missing").await.unwrap().is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 9);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_and_removed() {
        let ttl = Arc::new(TtlPolicy::new(TierTtlTable {
            speed: Duration::from_millis(30),
            ..TierTtlTable::default()
        }));
        let cache = InMemoryAudioCache::new(1024, ttl);
        cache.put("k", audio(b"abc"), CacheTier::Speed).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get("k").await.unwrap().is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_size_bytes, 0);
        assert_eq!(stats.expired_count, 1);
    }

    #[tokio::test]
    async fn test_tier_ttl_fixed_at_write_time() {
        let ttl = Arc::new(TtlPolicy::default());
        let cache = InMemoryAudioCache::new(1024, ttl.clone());
        cache.put("k", audio(b"abc"), CacheTier::Quality).await.unwrap();

        ttl.replace(TierTtlTable {
            quality: Duration::from_millis(1),
            ..TierTtlTable::default()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(1800));
    }

    #[tokio::test]
    async fn test_lru_eviction_over_capacity() {
        let cache = cache(10);
        cache.put("a", audio(b"aaaa"), CacheTier::Quality).await.unwrap();
        cache.put("b", audio(b"bbbb"), CacheTier::Quality).await.unwrap();
        // 访问 a，使 b 成为最久未访问
        cache.get("a").await.unwrap();
        cache.put("c", audio(b"cccc"), CacheTier::Quality).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_some());
        assert!(cache.get("b").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.total_size_bytes, 8);
        assert_eq!(stats.eviction_count, 1);
    }

    #[tokio::test]
    async fn test_entry_larger_than_capacity_rejected() {
        let cache = cache(4);
        let err = cache
            .put("k", audio(b"too large"), CacheTier::Speed)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::EntryTooLarge { size_bytes: 9, capacity_bytes: 4 }));
    }

    #[tokio::test]
    async fn test_overwrite_adjusts_size() {
        let cache = cache(1024);
        cache.put("k", audio(b"aaaa"), CacheTier::Speed).await.unwrap();
        cache.put("k", audio(b"bb"), CacheTier::Speed).await.unwrap();
        assert_eq!(cache.stats().await.total_size_bytes, 2);

        cache.remove("k").await.unwrap();
        assert_eq!(cache.stats().await.total_size_bytes, 0);
    }

    #[tokio::test]
    async fn test_evict_expired_sweeps_all() {
        let ttl = Arc::new(TtlPolicy::new(TierTtlTable {
            speed: Duration::from_millis(10),
            ..TierTtlTable::default()
        }));
        let cache = InMemoryAudioCache::new(1024, ttl);
        cache.put("a", audio(b"a"), CacheTier::Speed).await.unwrap();
        cache.put("b", audio(b"b"), CacheTier::Speed).await.unwrap();
        cache.put("c", audio(b"c"), CacheTier::Quality).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.evict_expired().await.unwrap(), 2);

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_keep_accounting_consistent() {
        let cache = Arc::new(cache(1024 * 1024));
        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("k{}", i % 8);
                cache.put(&key, audio(b"0123456789"), CacheTier::Balanced).await.unwrap();
                cache.get(&key).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 8);
        assert_eq!(stats.total_size_bytes, 80);
    }
}
