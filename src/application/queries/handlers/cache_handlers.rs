//! Cache Query Handlers

use std::sync::Arc;

use crate::application::ports::AudioCachePort;
use crate::application::queries::GetCacheStats;

/// 缓存统计响应
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatsResponse {
    pub backend: &'static str,
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub expired_count: u64,
    /// 命中率（0.0 ~ 1.0），无请求时为 0
    pub hit_rate: f64,
}

/// GetCacheStats Handler
pub struct GetCacheStatsHandler {
    audio_cache: Arc<dyn AudioCachePort>,
}

impl GetCacheStatsHandler {
    pub fn new(audio_cache: Arc<dyn AudioCachePort>) -> Self {
        Self { audio_cache }
    }

    pub async fn handle(&self, _query: GetCacheStats) -> CacheStatsResponse {
        let stats = self.audio_cache.stats().await;
        let lookups = stats.hit_count + stats.miss_count;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            stats.hit_count as f64 / lookups as f64
        };

        CacheStatsResponse {
            backend: self.audio_cache.backend_name(),
            total_entries: stats.total_entries,
            total_size_bytes: stats.total_size_bytes,
            max_size_bytes: stats.max_size_bytes,
            hit_count: stats.hit_count,
            miss_count: stats.miss_count,
            eviction_count: stats.eviction_count,
            expired_count: stats.expired_count,
            hit_rate,
        }
    }
}
