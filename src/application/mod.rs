//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsProvider、AudioCache、TelemetrySink）
//! - services: 指纹、单飞、音色目录与合成编排
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;

// Re-exports
pub use commands::{
    handlers::{ReloadVoicesHandler, SynthesizeHandler},
    ReloadVoices, ReloadVoicesResponse, Synthesize,
};

pub use error::ApplicationError;

pub use ports::{
    // Audio cache
    AudioCachePort,
    CacheEntry,
    CacheError,
    CacheStats,
    CachedAudio,
    TierTtlTable,
    TtlPolicy,
    // Telemetry
    TelemetryEvent,
    TelemetrySink,
    // TTS provider
    TtsProviderPort,
    VendorAudio,
    VendorRequest,
};

pub use queries::{
    handlers::{CacheStatsResponse, GetCacheStatsHandler, ListVoicesHandler, VoiceResponse},
    GetCacheStats, ListVoices,
};

pub use services::{
    CacheKey, CallRole, OrchestratorConfig, RequestCoalescer, ReloadReport, SynthesisOrchestrator,
    SynthesisResult, VoiceFilter, VoiceRegistry,
};
