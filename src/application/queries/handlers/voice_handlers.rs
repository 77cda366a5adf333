//! Voice Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::queries::ListVoices;
use crate::application::services::{VoiceFilter, VoiceRegistry};
use crate::domain::voice::{LanguageCode, ProviderId, VoiceGender, VoiceRecord};

// ============================================================================
// Response DTOs
// ============================================================================

/// 音色响应
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceResponse {
    pub voice_id: String,
    pub provider: String,
    pub native_id: String,
    pub display_name: String,
    pub gender: Option<String>,
    pub characteristics: Vec<String>,
    pub languages: Vec<String>,
}

impl From<VoiceRecord> for VoiceResponse {
    fn from(record: VoiceRecord) -> Self {
        Self {
            voice_id: record.voice_id,
            provider: record.provider.to_string(),
            native_id: record.native_id,
            display_name: record.display_name,
            gender: record.gender.map(|g| g.as_str().to_string()),
            characteristics: record.characteristics,
            languages: record.languages.iter().map(|l| l.to_string()).collect(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// ListVoices Handler
pub struct ListVoicesHandler {
    registry: Arc<VoiceRegistry>,
}

impl ListVoicesHandler {
    pub fn new(registry: Arc<VoiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn handle(&self, query: ListVoices) -> Result<Vec<VoiceResponse>, ApplicationError> {
        let provider = match query.provider.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(raw) => {
                let provider = ProviderId::new(raw);
                if !self.registry.providers().contains(&provider) {
                    return Err(ApplicationError::not_found("Provider", provider.to_string()));
                }
                Some(provider)
            }
            None => None,
        };

        let language = query
            .language
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .map(|raw| {
                LanguageCode::parse(raw)
                    .map_err(|e| ApplicationError::validation(format!("{}: {}", e, raw)))
            })
            .transpose()?;

        let gender = query
            .gender
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .map(|raw| {
                VoiceGender::parse(raw)
                    .ok_or_else(|| ApplicationError::validation(format!("Unknown gender: {}", raw)))
            })
            .transpose()?;

        let filter = VoiceFilter { language, gender };
        let voices = self.registry.list_voices(provider.as_ref(), &filter);
        Ok(voices.into_iter().map(VoiceResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> ListVoicesHandler {
        let registry = VoiceRegistry::from_records(vec![
            VoiceRecord::new(ProviderId::sarvam(), "anushka", "anushka", "Anushka")
                .with_gender(VoiceGender::Female)
                .with_languages(&["hi-IN", "en-IN"]),
            VoiceRecord::new(ProviderId::sarvam(), "abhilash", "abhilash", "Abhilash")
                .with_gender(VoiceGender::Male)
                .with_languages(&["hi-IN"]),
        ]);
        ListVoicesHandler::new(registry.arc())
    }

    #[test]
    fn test_filters_by_language_and_gender() {
        let voices = handler()
            .handle(ListVoices {
                provider: Some("Sarvam".into()),
                language: Some("hi-in".into()),
                gender: Some("male".into()),
            })
            .unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].voice_id, "abhilash");
    }

    #[test]
    fn test_rejects_bad_filters() {
        let handler = handler();
        assert!(matches!(
            handler.handle(ListVoices {
                language: Some("hindi".into()),
                ..Default::default()
            }),
            Err(ApplicationError::ValidationError(_))
        ));
        assert!(matches!(
            handler.handle(ListVoices {
                provider: Some("azure".into()),
                ..Default::default()
            }),
            Err(ApplicationError::NotFound { .. })
        ));
    }
}
