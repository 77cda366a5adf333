//! TTS Provider Port - 供应商合成能力抽象
//!
//! 每个供应商适配器声明自己的能力集合（合成、语言支持、原生音色映射），
//! 具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::synthesis::{AudioCodec, SynthesisRequest, Tuning, VendorError};
use crate::domain::voice::{LanguageCode, ProviderId, VoiceRecord};

/// 发往供应商的合成请求
///
/// 音色已解析为供应商原生 ID；调音参数由适配器按自身范围钳制
#[derive(Debug, Clone, PartialEq)]
pub struct VendorRequest {
    pub text: String,
    pub native_voice_id: String,
    pub language: LanguageCode,
    pub codec: AudioCodec,
    pub sample_rate_hz: u32,
    pub tuning: Tuning,
    pub enable_preprocessing: bool,
}

impl VendorRequest {
    pub fn from_request(request: &SynthesisRequest, native_voice_id: &str) -> Self {
        Self {
            text: request.text().to_string(),
            native_voice_id: native_voice_id.to_string(),
            language: request.language().clone(),
            codec: request.codec(),
            sample_rate_hz: request.sample_rate_hz(),
            tuning: *request.tuning(),
            enable_preprocessing: request.enable_preprocessing(),
        }
    }
}

/// 供应商返回的音频
#[derive(Debug, Clone, PartialEq)]
pub struct VendorAudio {
    pub audio: Bytes,
    pub codec: AudioCodec,
    pub sample_rate_hz: u32,
    /// 供应商侧请求 ID（用于追踪）
    pub request_id: Option<String>,
}

/// TTS Provider Port
///
/// 供应商错误必须在实现内翻译为 `VendorError`
#[async_trait]
pub trait TtsProviderPort: Send + Sync {
    fn provider_id(&self) -> &ProviderId;

    /// 执行合成
    async fn synthesize(&self, request: VendorRequest) -> Result<VendorAudio, VendorError>;

    /// 供应商是否支持该语言
    fn supports_language(&self, language: &LanguageCode) -> bool;

    /// 供应商能否输出该编码
    fn supports_codec(&self, _codec: AudioCodec) -> bool {
        true
    }

    /// 抽象音色 ID → 原生音色 ID，未知时返回 None
    fn native_voice_for(&self, voice_id: &str) -> Option<String>;

    /// 列出供应商的音色目录（启动与 reload 时调用一次）
    async fn list_voices(&self) -> Result<Vec<VoiceRecord>, VendorError>;

    /// 检查供应商是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
