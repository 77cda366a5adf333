//! Sled-based LRU Audio Cache Implementation
//!
//! 持久化后端：条目的层级与过期时间随条目一起落盘，重启后依旧生效

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{
    AudioCachePort, CacheEntry, CacheError, CacheStats, CachedAudio, TtlPolicy,
};
use crate::domain::synthesis::{AudioCodec, CacheTier};

const KEY_PREFIX: &str = "cache:";

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 数据库路径
    pub db_path: String,
    /// 最大缓存大小（字节）
    pub max_size_bytes: u64,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "data/audio_cache.sled".to_string(),
            max_size_bytes: 2 * 1024 * 1024 * 1024, // 2GB
        }
    }
}

/// 内部缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalCacheEntry {
    audio_data: Vec<u8>,
    size_bytes: u64,
    codec: String,
    sample_rate_hz: u32,
    provider: String,
    native_voice_id: String,
    tier: CacheTier,
    created_at_ms: i64,
    expires_at_ms: i64,
    last_accessed: i64,
}

impl InternalCacheEntry {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at_ms
    }

    fn into_entry(self, key: &str) -> Result<CacheEntry, CacheError> {
        let codec = AudioCodec::parse(&self.codec)
            .ok_or_else(|| CacheError::SerializationError(format!("unknown codec {}", self.codec)))?;

        Ok(CacheEntry {
            key: key.to_string(),
            audio: CachedAudio {
                audio: Bytes::from(self.audio_data),
                codec,
                sample_rate_hz: self.sample_rate_hz,
                provider: self.provider,
                native_voice_id: self.native_voice_id,
            },
            size_bytes: self.size_bytes,
            created_at: from_millis(self.created_at_ms),
            expires_at: from_millis(self.expires_at_ms),
            tier: self.tier,
        })
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn db_err(e: sled::Error) -> CacheError {
    CacheError::DatabaseError(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<InternalCacheEntry, CacheError> {
    bincode::deserialize(bytes).map_err(|e| CacheError::SerializationError(e.to_string()))
}

fn encode(entry: &InternalCacheEntry) -> Result<Vec<u8>, CacheError> {
    bincode::serialize(entry).map_err(|e| CacheError::SerializationError(e.to_string()))
}

/// Sled 音频缓存
pub struct SledAudioCache {
    db: Db,
    ttl: Arc<TtlPolicy>,
    max_size_bytes: u64,
    current_size: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    expired_count: AtomicU64,
}

impl SledAudioCache {
    /// 创建新的缓存实例
    pub fn new(config: &SledCacheConfig, ttl: Arc<TtlPolicy>) -> Result<Self, CacheError> {
        let db = sled::open(&config.db_path).map_err(db_err)?;

        // 计算当前缓存大小
        let current_size = Self::calculate_total_size(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            max_size_bytes = config.max_size_bytes,
            current_size = current_size,
            "SledAudioCache initialized"
        );

        Ok(Self {
            db,
            ttl,
            max_size_bytes: config.max_size_bytes,
            current_size: AtomicU64::new(current_size),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        })
    }

    /// 打开现有缓存
    pub fn open<P: AsRef<Path>>(path: P, max_size_bytes: u64, ttl: Arc<TtlPolicy>) -> Result<Self, CacheError> {
        let config = SledCacheConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            max_size_bytes,
        };
        Self::new(&config, ttl)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn db_key(cache_key: &str) -> String {
        format!("{}{}", KEY_PREFIX, cache_key)
    }

    /// 计算数据库中所有条目的总大小
    fn calculate_total_size(db: &Db) -> Result<u64, CacheError> {
        let mut total = 0u64;
        for item in db.scan_prefix(KEY_PREFIX) {
            let (_, value) = item.map_err(db_err)?;
            if let Ok(entry) = decode(&value) {
                total += entry.size_bytes;
            }
        }
        Ok(total)
    }

    /// 删除条目并扣减大小
    fn remove_raw(&self, db_key: &[u8]) -> Result<Option<InternalCacheEntry>, CacheError> {
        match self.db.remove(db_key).map_err(db_err)? {
            Some(data) => {
                let entry = decode(&data).ok();
                if let Some(entry) = &entry {
                    self.current_size.fetch_sub(entry.size_bytes, Ordering::Relaxed);
                }
                Ok(entry)
            }
            None => Ok(None),
        }
    }

    /// 仅当条目仍是读到的版本时删除，返回是否删除
    fn remove_if_unchanged(&self, db_key: &[u8], expected: &[u8], size_bytes: u64) -> Result<bool, CacheError> {
        let swapped = self
            .db
            .compare_and_swap(db_key, Some(expected), None::<sled::IVec>)
            .map_err(db_err)?
            .is_ok();
        if swapped {
            self.current_size.fetch_sub(size_bytes, Ordering::Relaxed);
        }
        Ok(swapped)
    }

    /// 仅当条目仍是读到的版本时写回访问时间，返回是否写回
    fn touch_if_unchanged(&self, db_key: &[u8], expected: &[u8], touched: Vec<u8>) -> Result<bool, CacheError> {
        Ok(self
            .db
            .compare_and_swap(db_key, Some(expected), Some(touched))
            .map_err(db_err)?
            .is_ok())
    }

    /// LRU 淘汰一个条目，返回是否有条目被淘汰
    fn evict_lru(&self) -> Result<bool, CacheError> {
        let mut oldest: Option<(sled::IVec, i64)> = None;

        for item in self.db.scan_prefix(KEY_PREFIX) {
            let (key, value) = item.map_err(db_err)?;
            if let Ok(entry) = decode(&value) {
                let is_older = oldest
                    .as_ref()
                    .map(|(_, last_accessed)| entry.last_accessed < *last_accessed)
                    .unwrap_or(true);

                if is_older {
                    oldest = Some((key, entry.last_accessed));
                }
            }
        }

        let Some((key, _)) = oldest else {
            return Ok(false);
        };

        if let Some(entry) = self.remove_raw(&key)? {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                key = %String::from_utf8_lossy(&key),
                size_bytes = entry.size_bytes,
                "LRU evicted cache entry"
            );
        }
        Ok(true)
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db.flush().map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl AudioCachePort for SledAudioCache {
    async fn get(&self, cache_key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let key = Self::db_key(cache_key);

        let Some(data) = self.db.get(&key).map_err(db_err)? else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let mut entry = decode(&data)?;
        let now = Utc::now();

        if entry.is_expired_at(now) {
            // 读取之后被重新写入的条目不能删
            if self.remove_if_unchanged(key.as_bytes(), &data, entry.size_bytes)? {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache_key = %cache_key, "Expired cache entry removed on access");
            }
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        // 更新 last_accessed (LRU touch)；条目已被替换时放弃
        entry.last_accessed = now.timestamp_millis();
        self.touch_if_unchanged(key.as_bytes(), &data, encode(&entry)?)?;

        self.hit_count.fetch_add(1, Ordering::Relaxed);
        entry.into_entry(cache_key).map(Some)
    }

    async fn put(&self, cache_key: &str, audio: CachedAudio, tier: CacheTier) -> Result<(), CacheError> {
        let size = audio.audio.len() as u64;
        if size > self.max_size_bytes {
            return Err(CacheError::EntryTooLarge {
                size_bytes: size,
                capacity_bytes: self.max_size_bytes,
            });
        }

        let key = Self::db_key(cache_key);
        // 覆盖写入时先移除旧条目
        self.remove_raw(key.as_bytes())?;

        // 淘汰以腾出空间
        while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
            if !self.evict_lru()? {
                break;
            }
        }

        let now = Utc::now();
        let entry = InternalCacheEntry {
            audio_data: audio.audio.to_vec(),
            size_bytes: size,
            codec: audio.codec.as_str().to_string(),
            sample_rate_hz: audio.sample_rate_hz,
            provider: audio.provider,
            native_voice_id: audio.native_voice_id,
            tier,
            created_at_ms: now.timestamp_millis(),
            expires_at_ms: self.ttl.expiry_from(now, tier).timestamp_millis(),
            last_accessed: now.timestamp_millis(),
        };

        self.db.insert(key, encode(&entry)?).map_err(db_err)?;
        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(
            cache_key = %cache_key,
            size_bytes = size,
            tier = %tier,
            "Audio cached"
        );

        Ok(())
    }

    async fn evict_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut expired = Vec::new();

        for item in self.db.scan_prefix(KEY_PREFIX) {
            let (key, value) = item.map_err(db_err)?;
            if decode(&value).map(|e| e.is_expired_at(now)).unwrap_or(false) {
                expired.push(key);
            }
        }

        let mut removed = 0;
        for key in expired {
            if self.remove_raw(&key)?.is_some() {
                removed += 1;
            }
        }

        self.expired_count.fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }

    async fn remove(&self, cache_key: &str) -> Result<(), CacheError> {
        self.remove_raw(Self::db_key(cache_key).as_bytes())?;
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let total_entries = self.db.scan_prefix(KEY_PREFIX).count();

        CacheStats {
            total_entries,
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
            expired_count: self.expired_count.load(Ordering::Relaxed),
        }
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TierTtlTable;
    use std::time::Duration;
    use tempfile::tempdir;

    fn audio(bytes: &[u8]) -> CachedAudio {
        CachedAudio {
            audio: Bytes::copy_from_slice(bytes),
            codec: AudioCodec::Mp3,
            sample_rate_hz: 44100,
            provider: "elevenlabs".to_string(),
            native_voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
        }
    }

    #[tokio::test]
    async fn test_cache_put_get() {
        let dir = tempdir().unwrap();
        let config = SledCacheConfig {
            db_path: dir.path().join("test.sled").to_string_lossy().to_string(),
            max_size_bytes: 1024 * 1024,
        };

        let cache = SledAudioCache::new(&config, Arc::new(TtlPolicy::default())).unwrap();

        // Put
        cache.put("test_key", audio(&[1, 2, 3, 4, 5]), CacheTier::Quality).await.unwrap();

        // Get
        let entry = cache.get("test_key").await.unwrap().unwrap();
        assert_eq!(&entry.audio.audio[..], &[1, 2, 3, 4, 5]);
        assert_eq!(entry.audio.codec, AudioCodec::Mp3);
        assert_eq!(entry.tier, CacheTier::Quality);
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(1800));

        // Stats
        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.total_size_bytes, 5);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.sled");

        {
            let cache = SledAudioCache::open(&path, 1024, Arc::new(TtlPolicy::default())).unwrap();
            cache.put("k", audio(b"persisted"), CacheTier::Balanced).await.unwrap();
            cache.flush().unwrap();
        }

        let cache = SledAudioCache::open(&path, 1024, Arc::new(TtlPolicy::default())).unwrap();
        assert_eq!(cache.stats().await.total_size_bytes, 9);
        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.tier, CacheTier::Balanced);
    }

    #[tokio::test]
    async fn test_expired_entry_removed_on_get() {
        let dir = tempdir().unwrap();
        let ttl = Arc::new(TtlPolicy::new(TierTtlTable {
            speed: Duration::from_millis(20),
            ..TierTtlTable::default()
        }));
        let cache = SledAudioCache::open(dir.path().join("ttl.sled"), 1024, ttl).unwrap();

        cache.put("a", audio(b"a"), CacheTier::Speed).await.unwrap();
        cache.put("b", audio(b"b"), CacheTier::Speed).await.unwrap();
        cache.put("c", audio(b"c"), CacheTier::Quality).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.get("a").await.unwrap().is_none());
        assert_eq!(cache.evict_expired().await.unwrap(), 1);

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_count, 2);
    }

    #[tokio::test]
    async fn test_lru_eviction_and_oversized_entry() {
        let dir = tempdir().unwrap();
        let cache = SledAudioCache::open(dir.path().join("lru.sled"), 8, Arc::new(TtlPolicy::default())).unwrap();

        cache.put("a", audio(b"aaaa"), CacheTier::Quality).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put("b", audio(b"bbbb"), CacheTier::Quality).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put("c", audio(b"cccc"), CacheTier::Quality).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());
        assert_eq!(cache.stats().await.eviction_count, 1);

        assert!(matches!(
            cache.put("big", audio(b"0123456789"), CacheTier::Speed).await,
            Err(CacheError::EntryTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_read_does_not_clobber_rewritten_entry() {
        let dir = tempdir().unwrap();
        let cache = SledAudioCache::open(dir.path().join("cas.sled"), 1024, Arc::new(TtlPolicy::default())).unwrap();
        let key = SledAudioCache::db_key("k");

        cache.put("k", audio(b"old"), CacheTier::Speed).await.unwrap();
        let stale = cache.db.get(&key).unwrap().unwrap();
        let mut stale_entry = decode(&stale).unwrap();
        stale_entry.last_accessed += 1;

        cache.put("k", audio(b"fresh!"), CacheTier::Quality).await.unwrap();

        assert!(!cache.remove_if_unchanged(key.as_bytes(), &stale, 3).unwrap());
        assert!(!cache
            .touch_if_unchanged(key.as_bytes(), &stale, encode(&stale_entry).unwrap())
            .unwrap());

        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(&entry.audio.audio[..], b"fresh!");
        assert_eq!(entry.tier, CacheTier::Quality);
        assert_eq!(cache.stats().await.total_size_bytes, 6);
    }
}
