//! Audio Cache Port - 音频缓存管理
//!
//! 定义带过期时间的音频缓存抽象接口，具体实现:
//! - InMemoryAudioCache (DashMap，进程内)
//! - SledAudioCache (持久化)
//!
//! 缓存只是通用的 key → 音频块存储，不理解 key 的指纹语义

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use thiserror::Error;

use crate::domain::synthesis::{AudioCodec, CacheTier};

/// Audio Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Entry of {size_bytes} bytes exceeds cache capacity of {capacity_bytes} bytes")]
    EntryTooLarge { size_bytes: u64, capacity_bytes: u64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 待缓存的音频及其描述
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAudio {
    pub audio: Bytes,
    pub codec: AudioCodec,
    pub sample_rate_hz: u32,
    /// 实际提供音频的供应商（不透明字符串）
    pub provider: String,
    pub native_voice_id: String,
}

/// 缓存条目
///
/// 写入后不可变；过期时间在写入时按层级确定
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub audio: CachedAudio,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub tier: CacheTier,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn mime_type(&self) -> &'static str {
        self.audio.codec.mime_type()
    }
}

/// 层级 → TTL 表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTtlTable {
    pub quality: Duration,
    pub balanced: Duration,
    pub speed: Duration,
}

impl TierTtlTable {
    pub fn ttl_for(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Quality => self.quality,
            CacheTier::Balanced => self.balanced,
            CacheTier::Speed => self.speed,
        }
    }
}

impl Default for TierTtlTable {
    fn default() -> Self {
        Self {
            quality: Duration::from_secs(1800),
            balanced: Duration::from_secs(900),
            speed: Duration::from_secs(300),
        }
    }
}

/// 共享且可替换的 TTL 策略
///
/// 只在写入时读取；替换表不会影响已缓存条目的过期时间
#[derive(Debug, Default)]
pub struct TtlPolicy {
    table: RwLock<TierTtlTable>,
}

impl TtlPolicy {
    pub fn new(table: TierTtlTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    pub fn current(&self) -> TierTtlTable {
        *self.table.read()
    }

    pub fn ttl_for(&self, tier: CacheTier) -> Duration {
        self.table.read().ttl_for(tier)
    }

    pub fn replace(&self, table: TierTtlTable) {
        *self.table.write() = table;
        tracing::info!(
            quality_secs = table.quality.as_secs(),
            balanced_secs = table.balanced.as_secs(),
            speed_secs = table.speed.as_secs(),
            "Cache TTL table replaced"
        );
    }

    /// 计算写入时刻的过期时间
    pub fn expiry_from(&self, now: DateTime<Utc>, tier: CacheTier) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl_for(tier))
            .unwrap_or_else(|_| chrono::Duration::days(36500));
        now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Audio Cache Port
///
/// - get: 过期条目等同于未命中，并同步删除
/// - put: 按写入时的层级 TTL 设定过期时间，超出容量时 LRU 淘汰
/// - evict_expired: 清理全部过期条目（访问时惰性触发 + 后台周期触发）
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// 根据缓存 key 获取条目，同时更新 LRU 访问时间
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// 存储音频
    async fn put(&self, key: &str, audio: CachedAudio, tier: CacheTier) -> Result<(), CacheError>;

    /// 删除所有已过期条目，返回删除数量
    async fn evict_expired(&self) -> Result<usize, CacheError>;

    /// 删除缓存条目
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;

    /// 后端名称（用于日志）
    fn backend_name(&self) -> &'static str;
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub expired_count: u64,
}
