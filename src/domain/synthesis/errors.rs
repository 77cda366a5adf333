//! Synthesis Context - Errors

use std::time::Duration;
use thiserror::Error;

use super::AudioCodec;
use crate::domain::voice::{LanguageCode, ProviderId};

/// 供应商适配器边界错误
///
/// 所有供应商 SDK / HTTP 错误都在适配器内翻译为此类型，不向上泄漏原始形态
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VendorError {
    #[error("Transient vendor error: {0}")]
    Transient(String),

    #[error("Vendor call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Vendor rejected request: {0}")]
    Rejected(String),

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(LanguageCode),

    #[error("Codec not supported: {0}")]
    UnsupportedCodec(AudioCodec),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Invalid vendor response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(ProviderId),
}

impl VendorError {
    /// 只有瞬时网络错误会在有限次数内重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Timeout(_) => "timeout",
            Self::Rejected(_) => "rejected",
            Self::UnsupportedLanguage(_) => "unsupported_language",
            Self::UnsupportedCodec(_) => "unsupported_codec",
            Self::VoiceNotFound(_) => "voice_not_found",
            Self::InvalidResponse(_) => "invalid_response",
            Self::NotConfigured(_) => "not_configured",
        }
    }
}

/// 某个供应商的失败原因
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: VendorError,
}

impl ProviderFailure {
    pub fn new(provider: ProviderId, error: VendorError) -> Self {
        Self { provider, error }
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// 合成错误（调用方可见的分类）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid tuning: {0}")]
    InvalidTuning(String),

    #[error("No provider can serve voice '{0}'")]
    UnsupportedVoice(String),

    #[error("No provider supports language {0}")]
    UnsupportedLanguage(LanguageCode),

    #[error("Synthesis failed (primary {primary}; fallback {})", describe_fallback(.fallback))]
    SynthesisFailed {
        primary: ProviderFailure,
        fallback: Option<ProviderFailure>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SynthesisError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// 调用方输入错误（不应重试）
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::InvalidTuning(_)
                | Self::UnsupportedVoice(_)
                | Self::UnsupportedLanguage(_)
        )
    }
}

fn describe_fallback(fallback: &Option<ProviderFailure>) -> String {
    match fallback {
        Some(failure) => failure.to_string(),
        None => "unavailable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(VendorError::Transient("reset".into()).is_retryable());
        assert!(!VendorError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!VendorError::Rejected("bad".into()).is_retryable());
    }

    #[test]
    fn test_synthesis_failed_carries_both_causes() {
        let err = SynthesisError::SynthesisFailed {
            primary: ProviderFailure::new(ProviderId::elevenlabs(), VendorError::Rejected("400".into())),
            fallback: Some(ProviderFailure::new(
                ProviderId::sarvam(),
                VendorError::Transient("503".into()),
            )),
        };
        let message = err.to_string();
        assert!(message.contains("elevenlabs"));
        assert!(message.contains("sarvam"));
        assert!(!err.is_caller_error());
    }
}
