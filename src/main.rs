//! Voxgate - 多供应商 TTS 合成网关
//!
//! 启动顺序：配置 → 日志 → 缓存 → 供应商 → 音色目录 → 编排器 → 清理任务 → HTTP

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;

use voxgate::application::{
    AudioCachePort, SynthesisOrchestrator, TtlPolicy, TtsProviderPort, VoiceRegistry,
};
use voxgate::config::{load_config, print_config, CacheBackend, CacheConfig, LogConfig, ProvidersConfig};
use voxgate::infrastructure::adapters::{ElevenLabsTtsClient, SarvamTtsClient};
use voxgate::infrastructure::events::TelemetryPublisher;
use voxgate::infrastructure::http::{AppState, HttpServer};
use voxgate::infrastructure::memory::InMemoryAudioCache;
use voxgate::infrastructure::persistence::sled::SledAudioCache;
use voxgate::infrastructure::worker::{CacheSweeper, CacheSweeperConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().context("Failed to load config")?;

    init_tracing(&config.log);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Voxgate - TTS 合成网关");
    print_config(&config);

    // 音频缓存
    let ttl = Arc::new(TtlPolicy::new(config.cache.ttl_table()));
    let audio_cache = build_cache(&config.cache, ttl);

    // 供应商适配器与音色目录
    let providers = build_providers(&config.providers)?;
    let registry = VoiceRegistry::load(&providers).await.arc();
    tracing::info!(
        providers = providers.len(),
        voices = registry.len(),
        "Voice registry loaded"
    );

    let telemetry = TelemetryPublisher::new().arc();

    let orchestrator = SynthesisOrchestrator::new(
        registry,
        providers,
        audio_cache.clone(),
        telemetry.clone(),
        config.synthesis.orchestrator_config(&config.providers),
    )
    .arc();

    // 过期缓存清理
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = CacheSweeper::new(
        CacheSweeperConfig {
            interval: config.cache.sweep_interval(),
        },
        audio_cache,
        shutdown_rx,
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    // HTTP 服务器
    let state = AppState::new(orchestrator, telemetry, config.synthesis.request_defaults());
    let server = HttpServer::new(config.server.addr(), state);

    server
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_handle.await {
        tracing::warn!(error = %e, "Cache sweeper did not stop cleanly");
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// 初始化日志，RUST_LOG 优先于配置
fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},voxgate={},tower_http=debug", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 构建缓存后端，Sled 打开失败时降级为进程内缓存
fn build_cache(config: &CacheConfig, ttl: Arc<TtlPolicy>) -> Arc<dyn AudioCachePort> {
    match config.backend {
        CacheBackend::Memory => InMemoryAudioCache::new(config.max_size_bytes, ttl).arc(),
        CacheBackend::Sled => match SledAudioCache::new(&config.sled_config(), ttl.clone()) {
            Ok(cache) => cache.arc(),
            Err(e) => {
                tracing::warn!(
                    path = %config.sled_path,
                    error = %e,
                    "Sled cache unavailable, degrading to in-memory cache"
                );
                InMemoryAudioCache::new(config.max_size_bytes, ttl).arc()
            }
        },
    }
}

/// 注册全部供应商适配器
///
/// 未配置密钥的供应商仍会注册，以便音色目录可用；调用时返回 NotConfigured
fn build_providers(config: &ProvidersConfig) -> anyhow::Result<Vec<Arc<dyn TtsProviderPort>>> {
    if config.sarvam.api_key.is_empty() {
        tracing::warn!(provider = "sarvam", "API key not set, synthesis calls will fail");
    }
    if config.elevenlabs.api_key.is_empty() {
        tracing::warn!(provider = "elevenlabs", "API key not set, synthesis calls will fail");
    }

    let sarvam = SarvamTtsClient::new(config.sarvam.client_config())
        .context("Failed to create Sarvam client")?;
    let elevenlabs = ElevenLabsTtsClient::new(config.elevenlabs.client_config())
        .context("Failed to create ElevenLabs client")?;

    let providers: Vec<Arc<dyn TtsProviderPort>> = vec![Arc::new(sarvam), Arc::new(elevenlabs)];
    for provider in &providers {
        tracing::info!(provider = %provider.provider_id(), "Provider registered");
    }

    Ok(providers)
}
