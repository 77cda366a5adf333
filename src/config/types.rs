//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::{OrchestratorConfig, TierTtlTable};
use crate::domain::synthesis::{AudioCodec, SynthesisRequest};
use crate::domain::voice::ProviderId;
use crate::infrastructure::adapters::{ElevenLabsTtsClientConfig, SarvamTtsClientConfig};
use crate::infrastructure::http::RequestDefaults;
use crate::infrastructure::memory::DEFAULT_MAX_SIZE_BYTES;
use crate::infrastructure::SledCacheConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 供应商配置
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// 合成调度配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5060
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Providers
// ============================================================================

/// 供应商配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// 主供应商
    #[serde(default = "default_primary")]
    pub primary: String,

    /// 回退供应商，留空表示不回退
    #[serde(default = "default_fallback")]
    pub fallback: Option<String>,

    #[serde(default)]
    pub sarvam: SarvamConfig,

    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
}

fn default_primary() -> String {
    "sarvam".to_string()
}

fn default_fallback() -> Option<String> {
    Some("elevenlabs".to_string())
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            fallback: default_fallback(),
            sarvam: SarvamConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn primary_id(&self) -> ProviderId {
        ProviderId::new(self.primary.trim())
    }

    pub fn fallback_id(&self) -> Option<ProviderId> {
        self.fallback
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ProviderId::new)
    }
}

/// Sarvam 配置
#[derive(Debug, Clone, Deserialize)]
pub struct SarvamConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_sarvam_url")]
    pub base_url: String,

    #[serde(default = "default_sarvam_model")]
    pub model: String,

    #[serde(default = "default_vendor_timeout")]
    pub timeout_secs: u64,
}

fn default_sarvam_url() -> String {
    "https://api.sarvam.ai".to_string()
}

fn default_sarvam_model() -> String {
    "bulbul:v2".to_string()
}

fn default_vendor_timeout() -> u64 {
    15
}

impl Default for SarvamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_sarvam_url(),
            model: default_sarvam_model(),
            timeout_secs: default_vendor_timeout(),
        }
    }
}

impl SarvamConfig {
    pub fn client_config(&self) -> SarvamTtsClientConfig {
        SarvamTtsClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// ElevenLabs 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ElevenLabsConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_elevenlabs_url")]
    pub base_url: String,

    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,

    #[serde(default = "default_elevenlabs_timeout")]
    pub timeout_secs: u64,

    /// 是否从 /v1/voices 拉取账号音色
    #[serde(default)]
    pub fetch_voices: bool,
}

fn default_elevenlabs_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_elevenlabs_timeout() -> u64 {
    20
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_elevenlabs_url(),
            model_id: default_elevenlabs_model(),
            timeout_secs: default_elevenlabs_timeout(),
            fetch_voices: false,
        }
    }
}

impl ElevenLabsConfig {
    pub fn client_config(&self) -> ElevenLabsTtsClientConfig {
        ElevenLabsTtsClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model_id: self.model_id.clone(),
            timeout_secs: self.timeout_secs,
            fetch_voices: self.fetch_voices,
        }
    }
}

// ============================================================================
// Synthesis
// ============================================================================

/// 合成调度配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 单个供应商最大尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_vendor_timeout")]
    pub vendor_timeout_secs: u64,

    /// 可选: mp3, linear16, mulaw, alaw, opus, flac, aac, wav
    #[serde(default = "default_codec")]
    pub default_codec: String,

    #[serde(default = "default_sample_rate")]
    pub default_sample_rate: u32,

    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_codec() -> String {
    "wav".to_string()
}

fn default_sample_rate() -> u32 {
    SynthesisRequest::DEFAULT_SAMPLE_RATE
}

fn default_max_text_chars() -> usize {
    SynthesisRequest::DEFAULT_MAX_TEXT_CHARS
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            vendor_timeout_secs: default_vendor_timeout(),
            default_codec: default_codec(),
            default_sample_rate: default_sample_rate(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

impl SynthesisConfig {
    pub fn orchestrator_config(&self, providers: &ProvidersConfig) -> OrchestratorConfig {
        OrchestratorConfig {
            primary: providers.primary_id(),
            fallback: providers.fallback_id(),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            vendor_timeout: Duration::from_secs(self.vendor_timeout_secs),
        }
    }

    /// 未识别的编码回落到 wav（加载时已校验）
    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            codec: AudioCodec::parse(&self.default_codec).unwrap_or_default(),
            sample_rate_hz: self.default_sample_rate,
            max_text_chars: self.max_text_chars,
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// 缓存后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sled,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sled => "sled",
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    #[serde(default = "default_sled_path")]
    pub sled_path: String,

    /// 最大缓存大小（字节）
    #[serde(default = "default_cache_size")]
    pub max_size_bytes: u64,

    #[serde(default = "default_ttl_quality")]
    pub ttl_quality_secs: u64,

    #[serde(default = "default_ttl_balanced")]
    pub ttl_balanced_secs: u64,

    #[serde(default = "default_ttl_speed")]
    pub ttl_speed_secs: u64,

    /// 过期清理间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sled_path() -> String {
    "data/audio_cache.sled".to_string()
}

fn default_cache_size() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

fn default_ttl_quality() -> u64 {
    1800
}

fn default_ttl_balanced() -> u64 {
    900
}

fn default_ttl_speed() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            sled_path: default_sled_path(),
            max_size_bytes: default_cache_size(),
            ttl_quality_secs: default_ttl_quality(),
            ttl_balanced_secs: default_ttl_balanced(),
            ttl_speed_secs: default_ttl_speed(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_table(&self) -> TierTtlTable {
        TierTtlTable {
            quality: Duration::from_secs(self.ttl_quality_secs),
            balanced: Duration::from_secs(self.ttl_balanced_secs),
            speed: Duration::from_secs(self.ttl_speed_secs),
        }
    }

    pub fn sled_config(&self) -> SledCacheConfig {
        SledCacheConfig {
            db_path: self.sled_path.clone(),
            max_size_bytes: self.max_size_bytes,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:5060");
        assert_eq!(config.providers.primary_id(), ProviderId::sarvam());
        assert_eq!(config.providers.fallback_id(), Some(ProviderId::elevenlabs()));
        assert_eq!(config.synthesis.max_attempts, 2);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl_table(), TierTtlTable::default());
    }

    #[test]
    fn test_blank_fallback_means_none() {
        let providers = ProvidersConfig {
            fallback: Some("  ".to_string()),
            ..ProvidersConfig::default()
        };
        assert_eq!(providers.fallback_id(), None);
    }

    #[test]
    fn test_orchestrator_config_conversion() {
        let synthesis = SynthesisConfig {
            retry_backoff_ms: 250,
            vendor_timeout_secs: 3,
            ..SynthesisConfig::default()
        };
        let config = synthesis.orchestrator_config(&ProvidersConfig::default());
        assert_eq!(config.retry_backoff, Duration::from_millis(250));
        assert_eq!(config.vendor_timeout, Duration::from_secs(3));
        assert_eq!(config.primary, ProviderId::sarvam());
    }

    #[test]
    fn test_request_defaults_parse_codec() {
        let synthesis = SynthesisConfig {
            default_codec: "MP3".to_string(),
            ..SynthesisConfig::default()
        };
        assert_eq!(synthesis.request_defaults().codec, AudioCodec::Mp3);
    }
}
