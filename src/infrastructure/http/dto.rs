//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::{CacheStatsResponse, SynthesisResult, VoiceResponse};
use crate::domain::synthesis::OptimizationLevel;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Synthesis DTOs
// ============================================================================

/// 音色选择；provider 缺省时使用配置的主供应商
#[derive(Debug, Deserialize)]
pub struct VoiceSelectionDto {
    #[serde(default)]
    pub provider: Option<String>,
    pub voice_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequestDto {
    pub text: String,
    pub language_code: String,
    #[serde(default)]
    pub optimization_level: Option<String>,
    pub voice: VoiceSelectionDto,
    #[serde(default = "default_true")]
    pub enable_preprocessing: bool,
    #[serde(default)]
    pub pitch: Option<f32>,
    #[serde(default)]
    pub pace: Option<f32>,
    #[serde(default)]
    pub loudness: Option<f32>,
    #[serde(default)]
    pub sample_rate_hz: Option<u32>,
    #[serde(default)]
    pub audio_codec: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SynthesisMetadataDto {
    pub provider: String,
    pub voice_id: String,
    pub language_code: String,
    pub optimization_level: &'static str,
    pub sample_rate_hz: u32,
    pub audio_codec: &'static str,
    pub cached: bool,
    pub coalesced: bool,
    pub latency_ms: u64,
    pub fallback_from_provider: Option<String>,
    pub outcome: Option<&'static str>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct SynthesizeResponseDto {
    pub audio_b64: String,
    pub mime_type: &'static str,
    pub metadata: SynthesisMetadataDto,
}

impl SynthesizeResponseDto {
    pub fn from_result(result: SynthesisResult, language_code: String, level: OptimizationLevel) -> Self {
        use base64::Engine;

        Self {
            audio_b64: base64::engine::general_purpose::STANDARD.encode(&result.audio),
            mime_type: result.mime_type(),
            metadata: SynthesisMetadataDto {
                provider: result.provider.to_string(),
                voice_id: result.native_voice_id,
                language_code,
                optimization_level: level.as_str(),
                sample_rate_hz: result.sample_rate_hz,
                audio_codec: result.codec.as_str(),
                cached: result.cached,
                coalesced: result.coalesced,
                latency_ms: result.latency_ms,
                fallback_from_provider: result.fallback_from.map(|p| p.to_string()),
                outcome: result.outcome.map(|o| o.as_str()),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}

// ============================================================================
// Voice DTOs
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListVoicesParams {
    pub provider: Option<String>,
    pub language: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoiceDto {
    pub voice_id: String,
    pub provider: String,
    pub native_id: String,
    pub display_name: String,
    pub gender: Option<String>,
    pub characteristics: Vec<String>,
    pub languages: Vec<String>,
}

impl From<VoiceResponse> for VoiceDto {
    fn from(voice: VoiceResponse) -> Self {
        Self {
            voice_id: voice.voice_id,
            provider: voice.provider,
            native_id: voice.native_id,
            display_name: voice.display_name,
            gender: voice.gender,
            characteristics: voice.characteristics,
            languages: voice.languages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoiceListDto {
    pub total: usize,
    pub voices: Vec<VoiceDto>,
}

#[derive(Debug, Serialize)]
pub struct ProviderReloadDto {
    pub provider: String,
    pub voices: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReloadVoicesDto {
    pub total_voices: usize,
    pub providers: Vec<ProviderReloadDto>,
}

// ============================================================================
// Cache DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CacheStatsDto {
    pub backend: &'static str,
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub expired_count: u64,
    pub hit_rate: f64,
    pub in_flight: usize,
}

impl CacheStatsDto {
    pub fn new(stats: CacheStatsResponse, in_flight: usize) -> Self {
        Self {
            backend: stats.backend,
            total_entries: stats.total_entries,
            total_size_bytes: stats.total_size_bytes,
            max_size_bytes: stats.max_size_bytes,
            hit_count: stats.hit_count,
            miss_count: stats.miss_count,
            eviction_count: stats.eviction_count,
            expired_count: stats.expired_count,
            hit_rate: stats.hit_rate,
            in_flight,
        }
    }
}
