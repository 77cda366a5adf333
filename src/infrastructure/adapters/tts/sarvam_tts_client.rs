//! Sarvam TTS Client - 调用 Sarvam 文本转语音 API
//!
//! 外部 API:
//! POST {base_url}/text-to-speech
//! Header: api-subscription-key
//! Request: {"text", "target_language_code", "speaker", "pitch", "pace", "loudness",
//!           "speech_sample_rate", "enable_preprocessing", "model", "output_audio_codec"}
//! Response: {"request_id": "...", "audios": ["<base64>"]}

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use super::{status_error, transport_error};
use crate::application::ports::{TtsProviderPort, VendorAudio, VendorRequest};
use crate::domain::synthesis::{TuningRange, VendorError};
use crate::domain::voice::{LanguageCode, ProviderId, VoiceGender, VoiceRecord};

/// Sarvam 全部音色共享的印度语种
const INDIC_LANGUAGES: &[&str] = &[
    "hi-IN", "en-IN", "bn-IN", "gu-IN", "ta-IN", "te-IN", "ml-IN", "kn-IN", "mr-IN", "pa-IN",
];

/// TTS 请求体 (JSON)
#[derive(Debug, Serialize)]
struct SarvamHttpRequest<'a> {
    text: &'a str,
    target_language_code: &'a str,
    speaker: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pitch: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pace: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loudness: Option<f32>,
    speech_sample_rate: u32,
    enable_preprocessing: bool,
    model: &'a str,
    output_audio_codec: &'a str,
}

#[derive(Debug, Deserialize)]
struct SarvamHttpResponse {
    request_id: Option<String>,
    #[serde(default)]
    audios: Vec<String>,
}

/// Sarvam 客户端配置
#[derive(Debug, Clone)]
pub struct SarvamTtsClientConfig {
    /// API 基础 URL
    pub base_url: String,
    pub api_key: String,
    /// 模型名称
    pub model: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for SarvamTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sarvam.ai".to_string(),
            api_key: String::new(),
            model: "bulbul:v2".to_string(),
            timeout_secs: 15,
        }
    }
}

impl SarvamTtsClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Sarvam TTS 客户端
///
/// 音色目录为静态列表
pub struct SarvamTtsClient {
    client: Client,
    config: SarvamTtsClientConfig,
    provider: ProviderId,
    voices: Vec<VoiceRecord>,
    languages: BTreeSet<LanguageCode>,
}

impl SarvamTtsClient {
    /// 供应商文档给出的调音范围
    pub const TUNING_RANGE: TuningRange = TuningRange {
        pitch: Some((-0.75, 0.75)),
        pace: Some((0.5, 2.0)),
        loudness: Some((0.3, 3.0)),
    };

    pub fn new(config: SarvamTtsClientConfig) -> Result<Self, VendorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VendorError::Transient(e.to_string()))?;

        let voices = Self::catalog();
        let languages = voices
            .iter()
            .flat_map(|v| v.languages.iter().cloned())
            .collect();

        Ok(Self {
            client,
            config,
            provider: ProviderId::sarvam(),
            voices,
            languages,
        })
    }

    /// 静态音色目录
    pub fn catalog() -> Vec<VoiceRecord> {
        let provider = ProviderId::sarvam();
        let voice = |id: &str, name: &str, gender, languages: &[&str], tags: &[&str]| {
            VoiceRecord::new(provider.clone(), id, id, name)
                .with_gender(gender)
                .with_languages(languages)
                .with_characteristics(tags)
        };

        vec![
            voice("anushka", "Anushka", VoiceGender::Female, INDIC_LANGUAGES, &["warm", "natural"]),
            voice("abhilash", "Abhilash", VoiceGender::Male, INDIC_LANGUAGES, &["confident"]),
            voice("manisha", "Manisha", VoiceGender::Female, &["hi-IN", "en-IN"], &["clear"]),
            voice("vidya", "Vidya", VoiceGender::Female, &["ta-IN", "en-IN"], &["professional"]),
            voice("arya", "Arya", VoiceGender::Female, &["bn-IN", "en-IN"], &["friendly"]),
            voice("karun", "Karun", VoiceGender::Male, &["ta-IN", "en-IN"], &["calm"]),
            voice("hitesh", "Hitesh", VoiceGender::Male, &["gu-IN", "en-IN"], &["energetic"]),
        ]
    }

    fn tts_url(&self) -> String {
        format!("{}/text-to-speech", self.config.base_url.trim_end_matches('/'))
    }

    fn decode_audio(response: SarvamHttpResponse) -> Result<(Bytes, Option<String>), VendorError> {
        let first = response
            .audios
            .first()
            .ok_or_else(|| VendorError::InvalidResponse("response carries no audio".to_string()))?;

        if response.audios.len() > 1 {
            tracing::debug!(chunks = response.audios.len(), "Sarvam returned multiple audio chunks, using the first");
        }

        let audio = STANDARD
            .decode(first.as_bytes())
            .map_err(|e| VendorError::InvalidResponse(format!("invalid base64 audio: {}", e)))?;

        Ok((Bytes::from(audio), response.request_id))
    }
}

#[async_trait]
impl TtsProviderPort for SarvamTtsClient {
    fn provider_id(&self) -> &ProviderId {
        &self.provider
    }

    async fn synthesize(&self, request: VendorRequest) -> Result<VendorAudio, VendorError> {
        if self.config.api_key.is_empty() {
            return Err(VendorError::NotConfigured(self.provider.clone()));
        }

        let tuning = Self::TUNING_RANGE.clamp(&request.tuning);
        let http_request = SarvamHttpRequest {
            text: &request.text,
            target_language_code: request.language.as_str(),
            speaker: &request.native_voice_id,
            pitch: tuning.pitch,
            pace: tuning.pace,
            loudness: tuning.loudness,
            speech_sample_rate: request.sample_rate_hz,
            enable_preprocessing: request.enable_preprocessing,
            model: &self.config.model,
            output_audio_codec: request.codec.as_str(),
        };

        tracing::debug!(
            url = %self.tts_url(),
            text_len = request.text.len(),
            speaker = %request.native_voice_id,
            language = %request.language,
            "Sending Sarvam TTS request"
        );

        let response = self
            .client
            .post(self.tts_url())
            .header("api-subscription-key", &self.config.api_key)
            .json(&http_request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_text));
        }

        let body: SarvamHttpResponse = response.json().await.map_err(|e| {
            VendorError::InvalidResponse(format!("Failed to parse Sarvam response: {}", e))
        })?;
        let (audio, request_id) = Self::decode_audio(body)?;

        tracing::debug!(
            request_id = ?request_id,
            audio_size = audio.len(),
            "Sarvam synthesis completed"
        );

        Ok(VendorAudio {
            audio,
            codec: request.codec,
            sample_rate_hz: request.sample_rate_hz,
            request_id,
        })
    }

    fn supports_language(&self, language: &LanguageCode) -> bool {
        self.languages.contains(language)
    }

    fn native_voice_for(&self, voice_id: &str) -> Option<String> {
        self.voices
            .iter()
            .find(|v| v.answers_to(voice_id))
            .map(|v| v.native_id.clone())
    }

    async fn list_voices(&self) -> Result<Vec<VoiceRecord>, VendorError> {
        Ok(self.voices.clone())
    }

    async fn health_check(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesis::Tuning;

    #[test]
    fn test_config_default() {
        let config = SarvamTtsClientConfig::default();
        assert_eq!(config.base_url, "https://api.sarvam.ai");
        assert_eq!(config.model, "bulbul:v2");
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn test_config_builder() {
        let config = SarvamTtsClientConfig::new("key")
            .with_base_url("http://localhost:9000/")
            .with_timeout(5);
        let client = SarvamTtsClient::new(config).unwrap();
        assert_eq!(client.tts_url(), "http://localhost:9000/text-to-speech");
    }

    #[test]
    fn test_catalog_languages() {
        let client = SarvamTtsClient::new(SarvamTtsClientConfig::default()).unwrap();
        let tamil = LanguageCode::parse("ta-IN").unwrap();
        assert!(client.supports_language(&tamil));
        assert!(!client.supports_language(&LanguageCode::parse("en-US").unwrap()));
        assert_eq!(client.native_voice_for("Karun").as_deref(), Some("karun"));
        assert_eq!(client.native_voice_for("rachel"), None);
        assert_eq!(SarvamTtsClient::catalog().len(), 7);
    }

    #[test]
    fn test_tuning_is_clamped_to_vendor_range() {
        let clamped = SarvamTtsClient::TUNING_RANGE.clamp(&Tuning {
            pitch: Some(1.0),
            pace: Some(0.3),
            loudness: None,
        });
        assert_eq!(clamped.pitch, Some(0.75));
        assert_eq!(clamped.pace, Some(0.5));
        assert_eq!(clamped.loudness, None);
    }

    #[test]
    fn test_payload_omits_unset_tuning() {
        let payload = SarvamHttpRequest {
            text: "Hello",
            target_language_code: "en-IN",
            speaker: "anushka",
            pitch: None,
            pace: Some(1.0),
            loudness: None,
            speech_sample_rate: 22050,
            enable_preprocessing: true,
            model: "bulbul:v2",
            output_audio_codec: "wav",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("pitch").is_none());
        assert_eq!(json["pace"], 1.0);
        assert_eq!(json["speaker"], "anushka");
    }

    #[test]
    fn test_decode_audio() {
        let response = SarvamHttpResponse {
            request_id: Some("req-1".into()),
            audios: vec![STANDARD.encode(b"RIFF")],
        };
        let (audio, request_id) = SarvamTtsClient::decode_audio(response).unwrap();
        assert_eq!(&audio[..], b"RIFF");
        assert_eq!(request_id.as_deref(), Some("req-1"));

        let empty = SarvamHttpResponse {
            request_id: None,
            audios: vec![],
        };
        assert!(matches!(
            SarvamTtsClient::decode_audio(empty),
            Err(VendorError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let client = SarvamTtsClient::new(SarvamTtsClientConfig::default()).unwrap();
        let request = VendorRequest {
            text: "Hello".into(),
            native_voice_id: "anushka".into(),
            language: LanguageCode::parse("en-IN").unwrap(),
            codec: Default::default(),
            sample_rate_hz: 22050,
            tuning: Tuning::default(),
            enable_preprocessing: true,
        };
        assert!(matches!(
            client.synthesize(request).await,
            Err(VendorError::NotConfigured(_))
        ));
    }
}
