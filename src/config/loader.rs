//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::synthesis::{AudioCodec, SynthesisRequest};
use crate::domain::voice::ProviderId;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 已实现适配器的供应商
const KNOWN_PROVIDERS: &[&str] = &["sarvam", "elevenlabs"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOXGATE_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOXGATE_SERVER__PORT=8080`
/// - `VOXGATE_PROVIDERS__PRIMARY=elevenlabs`
/// - `VOXGATE_PROVIDERS__SARVAM__API_KEY=...`
/// - `VOXGATE_CACHE__BACKEND=sled`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5060)?
        .set_default("providers.primary", "sarvam")?
        .set_default("providers.fallback", "elevenlabs")?
        .set_default("synthesis.max_attempts", 2)?
        .set_default("synthesis.retry_backoff_ms", 100)?
        .set_default("synthesis.vendor_timeout_secs", 15)?
        .set_default("synthesis.default_codec", "wav")?
        .set_default("synthesis.default_sample_rate", 22050)?
        .set_default("synthesis.max_text_chars", 2000)?
        .set_default("cache.backend", "memory")?
        .set_default("cache.sled_path", "data/audio_cache.sled")?
        .set_default("cache.ttl_quality_secs", 1800)?
        .set_default("cache.ttl_balanced_secs", 900)?
        .set_default("cache.ttl_speed_secs", 300)?
        .set_default("cache.sweep_interval_secs", 60)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: VOXGATE_CACHE__TTL_SPEED_SECS=120
    builder = builder.add_source(
        Environment::with_prefix("VOXGATE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if config.server.port == 0 {
        return invalid("Server port cannot be 0".to_string());
    }

    let primary = config.providers.primary_id();
    if !is_known(&primary) {
        return invalid(format!("Unknown primary provider: {}", primary));
    }
    if let Some(fallback) = config.providers.fallback_id() {
        if !is_known(&fallback) {
            return invalid(format!("Unknown fallback provider: {}", fallback));
        }
        if fallback == primary {
            return invalid(format!("Fallback provider must differ from primary ({})", primary));
        }
    }

    if config.synthesis.max_attempts == 0 {
        return invalid("synthesis.max_attempts must be at least 1".to_string());
    }
    if config.synthesis.vendor_timeout_secs == 0 {
        return invalid("synthesis.vendor_timeout_secs cannot be 0".to_string());
    }
    if AudioCodec::parse(&config.synthesis.default_codec).is_none() {
        return invalid(format!(
            "Unknown default codec: {}",
            config.synthesis.default_codec
        ));
    }
    let (min_rate, max_rate) = SynthesisRequest::SAMPLE_RATE_RANGE;
    if !(min_rate..=max_rate).contains(&config.synthesis.default_sample_rate) {
        return invalid(format!(
            "synthesis.default_sample_rate must be between {} and {}",
            min_rate, max_rate
        ));
    }
    if config.synthesis.max_text_chars == 0 {
        return invalid("synthesis.max_text_chars cannot be 0".to_string());
    }

    let cache = &config.cache;
    if cache.ttl_quality_secs == 0 || cache.ttl_balanced_secs == 0 || cache.ttl_speed_secs == 0 {
        return invalid("Cache TTLs must be greater than 0".to_string());
    }
    if cache.max_size_bytes == 0 {
        return invalid("cache.max_size_bytes cannot be 0".to_string());
    }
    if cache.sweep_interval_secs == 0 {
        return invalid("cache.sweep_interval_secs cannot be 0".to_string());
    }

    Ok(())
}

fn is_known(provider: &ProviderId) -> bool {
    KNOWN_PROVIDERS.contains(&provider.as_str())
}

/// 打印配置信息（用于启动时日志），不输出密钥
pub fn print_config(config: &AppConfig) {
    let providers = &config.providers;
    tracing::info!("=== Application Configuration ===");
    tracing::info!(addr = %config.server.addr(), "Server");
    tracing::info!(
        primary = %providers.primary,
        fallback = providers.fallback.as_deref().unwrap_or("none"),
        sarvam_key_set = !providers.sarvam.api_key.is_empty(),
        elevenlabs_key_set = !providers.elevenlabs.api_key.is_empty(),
        elevenlabs_fetch_voices = providers.elevenlabs.fetch_voices,
        "Providers"
    );
    tracing::info!(
        max_attempts = config.synthesis.max_attempts,
        retry_backoff_ms = config.synthesis.retry_backoff_ms,
        vendor_timeout_secs = config.synthesis.vendor_timeout_secs,
        default_codec = %config.synthesis.default_codec,
        default_sample_rate = config.synthesis.default_sample_rate,
        max_text_chars = config.synthesis.max_text_chars,
        "Synthesis"
    );
    tracing::info!(
        backend = config.cache.backend.as_str(),
        max_size_bytes = config.cache.max_size_bytes,
        ttl_quality_secs = config.cache.ttl_quality_secs,
        ttl_balanced_secs = config.cache.ttl_balanced_secs,
        ttl_speed_secs = config.cache.ttl_speed_secs,
        sweep_interval_secs = config.cache.sweep_interval_secs,
        "Cache"
    );
    if config.cache.backend == super::types::CacheBackend::Sled {
        tracing::info!(path = %config.cache.sled_path, "Sled cache path");
    }
    tracing::info!(level = %config.log.level, json = config.log.json, "Log");
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_same_primary_and_fallback() {
        let mut config = AppConfig::default();
        config.providers.fallback = Some("sarvam".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unknown_primary() {
        let mut config = AppConfig::default();
        config.providers.primary = "polly".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_attempts_and_ttl() {
        let mut config = AppConfig::default();
        config.synthesis.max_attempts = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.cache.ttl_speed_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unknown_codec() {
        let mut config = AppConfig::default();
        config.synthesis.default_codec = "ogg".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[providers]
primary = "elevenlabs"
fallback = "sarvam"

[cache]
backend = "sled"
ttl_speed_secs = 60
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.providers.primary_id(), ProviderId::elevenlabs());
        assert_eq!(config.cache.backend, super::super::types::CacheBackend::Sled);
        assert_eq!(config.cache.ttl_speed_secs, 60);
        assert_eq!(config.cache.ttl_quality_secs, 1800);
        assert_eq!(config.server.port, 5060);
    }
}
