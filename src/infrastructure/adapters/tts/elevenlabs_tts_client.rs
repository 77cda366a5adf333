//! ElevenLabs TTS Client - 调用 ElevenLabs 文本转语音 API
//!
//! 外部 API:
//! POST {base_url}/v1/text-to-speech/{voice_id}?output_format=...
//! Header: xi-api-key
//! Request: {"text", "model_id", "voice_settings": {...}}  (JSON)
//! Response: 音频二进制
//!
//! GET {base_url}/v1/voices  → {"voices": [{"voice_id", "name", "labels"}]}

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::{status_error, transport_error};
use crate::application::ports::{TtsProviderPort, VendorAudio, VendorRequest};
use crate::domain::synthesis::{AudioCodec, SynthesisRequest, TuningRange, VendorError};
use crate::domain::voice::{LanguageCode, ProviderId, VoiceGender, VoiceRecord};

/// ElevenLabs 音色统一登记的语言
const VOICE_LANGUAGES: &[&str] = &["en-IN", "en-US"];

/// PCM 输出支持的采样率
const PCM_SAMPLE_RATES: &[u32] = &[8000, 16000, 22050, 24000, 44100, 48000];

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

/// TTS 请求体 (JSON)
#[derive(Debug, Serialize)]
struct ElevenLabsHttpRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct VoiceListResponse {
    #[serde(default)]
    voices: Vec<VoiceListItem>,
}

#[derive(Debug, Deserialize)]
struct VoiceListItem {
    voice_id: String,
    name: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

impl VoiceListItem {
    fn into_record(self, provider: &ProviderId) -> VoiceRecord {
        let gender = self.labels.get("gender").and_then(|g| VoiceGender::parse(g));
        let characteristics: Vec<&str> = ["accent", "age", "use case"]
            .iter()
            .filter_map(|label| self.labels.get(*label).map(String::as_str))
            .collect();

        let mut record = VoiceRecord::new(provider.clone(), &self.name, &self.voice_id, &self.name)
            .with_characteristics(&characteristics)
            .with_languages(VOICE_LANGUAGES);
        record.gender = gender;
        record
    }
}

/// ElevenLabs 客户端配置
#[derive(Debug, Clone)]
pub struct ElevenLabsTtsClientConfig {
    /// API 基础 URL
    pub base_url: String,
    pub api_key: String,
    pub model_id: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 是否通过 /v1/voices 拉取账号下的音色
    pub fetch_voices: bool,
}

impl Default for ElevenLabsTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            model_id: "eleven_multilingual_v2".to_string(),
            timeout_secs: 20,
            fetch_voices: false,
        }
    }
}

impl ElevenLabsTtsClientConfig {
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

/// ElevenLabs TTS 客户端
pub struct ElevenLabsTtsClient {
    client: Client,
    config: ElevenLabsTtsClientConfig,
    provider: ProviderId,
    /// 静态目录 + 最近一次拉取到的账号音色
    voices: RwLock<Vec<VoiceRecord>>,
}

impl ElevenLabsTtsClient {
    /// 只支持语速（speed），音高与响度不可调
    pub const TUNING_RANGE: TuningRange = TuningRange {
        pitch: None,
        pace: Some((0.7, 1.2)),
        loudness: None,
    };

    pub fn new(config: ElevenLabsTtsClientConfig) -> Result<Self, VendorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VendorError::Transient(e.to_string()))?;

        Ok(Self {
            client,
            config,
            provider: ProviderId::elevenlabs(),
            voices: RwLock::new(Self::catalog()),
        })
    }

    /// 静态音色目录
    pub fn catalog() -> Vec<VoiceRecord> {
        let provider = ProviderId::elevenlabs();
        let voice = |id: &str, native: &str, name: &str, gender, tags: &[&str]| {
            VoiceRecord::new(provider.clone(), id, native, name)
                .with_gender(gender)
                .with_languages(VOICE_LANGUAGES)
                .with_characteristics(tags)
        };

        vec![
            voice("rachel", "21m00Tcm4TlvDq8ikWAM", "Rachel", VoiceGender::Female, &["premium", "natural"]),
            voice("bella", "EXAVITQu4vr4xnSDxMaL", "Bella", VoiceGender::Female, &["expressive"]),
            voice("adam", "pNInz6obpgDQGcFmQJfb", "Adam", VoiceGender::Male, &["premium"]),
        ]
    }

    /// 编码 + 采样率 → (output_format, 实际采样率)
    pub fn output_format(codec: AudioCodec, sample_rate_hz: u32) -> Result<(String, u32), VendorError> {
        match codec {
            AudioCodec::Mp3 if sample_rate_hz <= 22050 => Ok(("mp3_22050_32".to_string(), 22050)),
            AudioCodec::Mp3 => Ok(("mp3_44100_128".to_string(), 44100)),
            AudioCodec::Linear16 => {
                let rate = PCM_SAMPLE_RATES
                    .iter()
                    .copied()
                    .min_by_key(|rate| rate.abs_diff(sample_rate_hz))
                    .unwrap_or(22050);
                Ok((format!("pcm_{}", rate), rate))
            }
            AudioCodec::Mulaw => Ok(("ulaw_8000".to_string(), 8000)),
            AudioCodec::Alaw => Ok(("alaw_8000".to_string(), 8000)),
            AudioCodec::Opus => Ok(("opus_48000_64".to_string(), 48000)),
            other => Err(VendorError::UnsupportedCodec(other)),
        }
    }

    fn tts_url(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        )
    }

    fn voices_url(&self) -> String {
        format!("{}/v1/voices", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch_voices(&self) -> Result<Vec<VoiceRecord>, VendorError> {
        let response = self
            .client
            .get(self.voices_url())
            .header("xi-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_text));
        }

        let body: VoiceListResponse = response.json().await.map_err(|e| {
            VendorError::InvalidResponse(format!("Failed to parse voice list: {}", e))
        })?;

        Ok(body
            .voices
            .into_iter()
            .map(|item| item.into_record(&self.provider))
            .collect())
    }
}

/// ElevenLabs 原生音色 ID 为 20 位字母数字
fn looks_like_native_id(voice_id: &str) -> bool {
    voice_id.len() == 20 && voice_id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// 静态目录优先，拉取结果补充其余音色
fn merge_catalog(fetched: Vec<VoiceRecord>) -> Vec<VoiceRecord> {
    let mut merged = ElevenLabsTtsClient::catalog();
    for record in fetched {
        let known = merged
            .iter()
            .any(|r| r.voice_id == record.voice_id || r.native_id == record.native_id);
        if !known {
            merged.push(record);
        }
    }
    merged
}

#[async_trait]
impl TtsProviderPort for ElevenLabsTtsClient {
    fn provider_id(&self) -> &ProviderId {
        &self.provider
    }

    async fn synthesize(&self, request: VendorRequest) -> Result<VendorAudio, VendorError> {
        if self.config.api_key.is_empty() {
            return Err(VendorError::NotConfigured(self.provider.clone()));
        }

        let (output_format, sample_rate_hz) = Self::output_format(request.codec, request.sample_rate_hz)?;
        let tuning = Self::TUNING_RANGE.clamp(&request.tuning);
        let http_request = ElevenLabsHttpRequest {
            text: &request.text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.5,
                speed: tuning.pace,
            },
        };

        let url = self.tts_url(&request.native_voice_id);
        tracing::debug!(
            url = %url,
            output_format = %output_format,
            text_len = request.text.len(),
            "Sending ElevenLabs TTS request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", output_format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .json(&http_request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_text));
        }

        let request_id = response
            .headers()
            .get("request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let audio = response
            .bytes()
            .await
            .map_err(|e| VendorError::InvalidResponse(format!("Failed to read audio: {}", e)))?;

        tracing::debug!(
            request_id = ?request_id,
            audio_size = audio.len(),
            "ElevenLabs synthesis completed"
        );

        Ok(VendorAudio {
            audio,
            codec: request.codec,
            sample_rate_hz,
            request_id,
        })
    }

    fn supports_language(&self, language: &LanguageCode) -> bool {
        VOICE_LANGUAGES.iter().any(|code| *code == language.as_str())
    }

    /// wav / flac / aac 没有对应的 output_format
    fn supports_codec(&self, codec: AudioCodec) -> bool {
        Self::output_format(codec, SynthesisRequest::DEFAULT_SAMPLE_RATE).is_ok()
    }

    fn native_voice_for(&self, voice_id: &str) -> Option<String> {
        let voices = self.voices.read();
        voices
            .iter()
            .find(|v| v.answers_to(voice_id))
            .map(|v| v.native_id.clone())
            .or_else(|| looks_like_native_id(voice_id.trim()).then(|| voice_id.trim().to_string()))
    }

    /// 拉取失败时退回静态目录
    async fn list_voices(&self) -> Result<Vec<VoiceRecord>, VendorError> {
        if !self.config.fetch_voices || self.config.api_key.is_empty() {
            return Ok(self.voices.read().clone());
        }

        let merged = match self.fetch_voices().await {
            Ok(fetched) => {
                tracing::info!(fetched = fetched.len(), "ElevenLabs voices fetched");
                merge_catalog(fetched)
            }
            Err(e) => {
                tracing::warn!(error = %e, "ElevenLabs voice listing failed, using static catalog");
                Self::catalog()
            }
        };

        *self.voices.write() = merged.clone();
        Ok(merged)
    }

    async fn health_check(&self) -> bool {
        if self.config.api_key.is_empty() {
            return false;
        }
        match self
            .client
            .get(self.voices_url())
            .header("xi-api-key", &self.config.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ElevenLabsTtsClientConfig::default();
        assert_eq!(config.base_url, "https://api.elevenlabs.io");
        assert_eq!(config.model_id, "eleven_multilingual_v2");
        assert!(!config.fetch_voices);
    }

    #[test]
    fn test_output_format_mapping() {
        assert_eq!(
            ElevenLabsTtsClient::output_format(AudioCodec::Mp3, 44100).unwrap(),
            ("mp3_44100_128".to_string(), 44100)
        );
        assert_eq!(
            ElevenLabsTtsClient::output_format(AudioCodec::Linear16, 23000).unwrap(),
            ("pcm_22050".to_string(), 22050)
        );
        assert_eq!(
            ElevenLabsTtsClient::output_format(AudioCodec::Mulaw, 22050).unwrap().0,
            "ulaw_8000"
        );
        assert!(matches!(
            ElevenLabsTtsClient::output_format(AudioCodec::Wav, 22050),
            Err(VendorError::UnsupportedCodec(AudioCodec::Wav))
        ));
    }

    #[test]
    fn test_codec_capability_matches_output_formats() {
        let client = ElevenLabsTtsClient::new(ElevenLabsTtsClientConfig::default()).unwrap();
        assert!(client.supports_codec(AudioCodec::Mp3));
        assert!(client.supports_codec(AudioCodec::Opus));
        assert!(!client.supports_codec(AudioCodec::Wav));
        assert!(!client.supports_codec(AudioCodec::Flac));
    }

    #[test]
    fn test_native_voice_lookup() {
        let client = ElevenLabsTtsClient::new(ElevenLabsTtsClientConfig::default()).unwrap();
        assert_eq!(
            client.native_voice_for("rachel").as_deref(),
            Some("21m00Tcm4TlvDq8ikWAM")
        );
        // 账号下的自定义音色可直接用原生 ID
        assert_eq!(
            client.native_voice_for("AZnzlk1XvdvUeBnXmlld").as_deref(),
            Some("AZnzlk1XvdvUeBnXmlld")
        );
        assert_eq!(client.native_voice_for("anushka"), None);
    }

    #[test]
    fn test_only_speed_is_forwarded() {
        let tuning = ElevenLabsTtsClient::TUNING_RANGE.clamp(&crate::domain::synthesis::Tuning {
            pitch: Some(0.5),
            pace: Some(2.0),
            loudness: Some(1.5),
        });
        assert_eq!(tuning.pace, Some(1.2));
        assert_eq!(tuning.pitch, None);
        assert_eq!(tuning.loudness, None);
    }

    #[test]
    fn test_voice_list_item_to_record() {
        let json = r#"{"voices":[{"voice_id":"AZnzlk1XvdvUeBnXmlld","name":"Domi","labels":{"gender":"female","accent":"american"}}]}"#;
        let body: VoiceListResponse = serde_json::from_str(json).unwrap();
        let records: Vec<_> = body
            .voices
            .into_iter()
            .map(|item| item.into_record(&ProviderId::elevenlabs()))
            .collect();

        assert_eq!(records[0].voice_id, "domi");
        assert_eq!(records[0].native_id, "AZnzlk1XvdvUeBnXmlld");
        assert_eq!(records[0].gender, Some(VoiceGender::Female));
        assert_eq!(records[0].characteristics, vec!["american".to_string()]);

        let merged = merge_catalog(records);
        assert_eq!(merged.len(), 4);
    }

    #[tokio::test]
    async fn test_static_catalog_without_fetch() {
        let client = ElevenLabsTtsClient::new(ElevenLabsTtsClientConfig::new("key")).unwrap();
        let voices = client.list_voices().await.unwrap();
        assert_eq!(voices.len(), 3);
        assert!(client.supports_language(&LanguageCode::parse("en-US").unwrap()));
        assert!(!client.supports_language(&LanguageCode::parse("ta-IN").unwrap()));
    }
}
