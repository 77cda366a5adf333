//! Voice Context - Errors

use thiserror::Error;

use super::ProviderId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("Voice '{voice_id}' not found for provider {provider}")]
    NotFound {
        voice_id: String,
        provider: ProviderId,
    },

    #[error("Unknown provider: {0}")]
    UnknownProvider(ProviderId),
}

impl VoiceError {
    pub fn not_found(voice_id: impl Into<String>, provider: &ProviderId) -> Self {
        Self::NotFound {
            voice_id: voice_id.into(),
            provider: provider.clone(),
        }
    }
}
