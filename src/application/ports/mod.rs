//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod telemetry;
mod tts_provider;

pub use audio_cache::{
    AudioCachePort, CacheEntry, CacheError, CacheStats, CachedAudio, TierTtlTable, TtlPolicy,
};
pub use telemetry::{TelemetryEvent, TelemetrySink};
pub use tts_provider::{TtsProviderPort, VendorAudio, VendorRequest};
