//! Cache Sweeper - Background Expiry Processor

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::application::ports::AudioCachePort;

/// Sweeper 配置
#[derive(Debug, Clone)]
pub struct CacheSweeperConfig {
    /// 清理间隔
    pub interval: Duration,
}

impl Default for CacheSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// 缓存清理 Worker
///
/// 周期性调用 `evict_expired()`，与访问时的惰性删除互补
pub struct CacheSweeper {
    config: CacheSweeperConfig,
    audio_cache: Arc<dyn AudioCachePort>,
    shutdown: watch::Receiver<bool>,
}

impl CacheSweeper {
    pub fn new(
        config: CacheSweeperConfig,
        audio_cache: Arc<dyn AudioCachePort>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            audio_cache,
            shutdown,
        }
    }

    /// 执行一次清理，返回删除数量
    pub async fn sweep_once(&self) -> usize {
        match self.audio_cache.evict_expired().await {
            Ok(0) => 0,
            Ok(removed) => {
                tracing::debug!(
                    backend = self.audio_cache.backend_name(),
                    removed,
                    "Expired cache entries swept"
                );
                removed
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.audio_cache.backend_name(),
                    error = %e,
                    "Cache sweep failed"
                );
                0
            }
        }
    }

    /// 启动 Worker，收到关闭信号后退出
    pub async fn run(mut self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            backend = self.audio_cache.backend_name(),
            "CacheSweeper started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // 首个 tick 立即完成，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("CacheSweeper stopped");
    }
}
