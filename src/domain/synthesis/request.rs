//! Synthesis Context - SynthesisRequest

use super::{AudioCodec, SynthesisError, Tuning};
use crate::domain::voice::{LanguageCode, ProviderId};

/// 合成请求
///
/// 不变量:
/// - text 去除首尾空白后非空，且字符数不超过上限
/// - sample_rate_hz 在 8000 ~ 48000 之间
/// - tuning 在请求级硬限制内，且已四舍五入到 0.01
/// - 构造后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    language: LanguageCode,
    voice_id: String,
    provider: Option<ProviderId>,
    codec: AudioCodec,
    sample_rate_hz: u32,
    tuning: Tuning,
    enable_preprocessing: bool,
}

impl SynthesisRequest {
    pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
    pub const DEFAULT_MAX_TEXT_CHARS: usize = 2000;
    pub const SAMPLE_RATE_RANGE: (u32, u32) = (8000, 48000);

    pub fn builder(
        text: impl Into<String>,
        language_code: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> SynthesisRequestBuilder {
        SynthesisRequestBuilder {
            text: text.into(),
            language_code: language_code.into(),
            voice_id: voice_id.into(),
            provider: None,
            codec: AudioCodec::default(),
            sample_rate_hz: Self::DEFAULT_SAMPLE_RATE,
            tuning: Tuning::default(),
            enable_preprocessing: true,
            max_text_chars: Self::DEFAULT_MAX_TEXT_CHARS,
        }
    }

    // Getters
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &LanguageCode {
        &self.language
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    /// 调用方指定的首选供应商
    pub fn provider(&self) -> Option<&ProviderId> {
        self.provider.as_ref()
    }

    pub fn codec(&self) -> AudioCodec {
        self.codec
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn enable_preprocessing(&self) -> bool {
        self.enable_preprocessing
    }
}

/// SynthesisRequest 构造器，`build()` 时统一校验
#[derive(Debug, Clone)]
pub struct SynthesisRequestBuilder {
    text: String,
    language_code: String,
    voice_id: String,
    provider: Option<ProviderId>,
    codec: AudioCodec,
    sample_rate_hz: u32,
    tuning: Tuning,
    enable_preprocessing: bool,
    max_text_chars: usize,
}

impl SynthesisRequestBuilder {
    pub fn provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn codec(mut self, codec: AudioCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn sample_rate_hz(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    pub fn tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn enable_preprocessing(mut self, enabled: bool) -> Self {
        self.enable_preprocessing = enabled;
        self
    }

    pub fn max_text_chars(mut self, max: usize) -> Self {
        self.max_text_chars = max;
        self
    }

    pub fn build(self) -> Result<SynthesisRequest, SynthesisError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(SynthesisError::invalid_request("text must not be empty"));
        }
        let char_count = text.chars().count();
        if char_count > self.max_text_chars {
            return Err(SynthesisError::invalid_request(format!(
                "text is {} characters, limit is {}",
                char_count, self.max_text_chars
            )));
        }

        let language = LanguageCode::parse(&self.language_code)
            .map_err(|e| SynthesisError::invalid_request(format!("{}: {}", e, self.language_code)))?;

        let voice_id = self.voice_id.trim();
        if voice_id.is_empty() {
            return Err(SynthesisError::invalid_request("voice id must not be empty"));
        }

        let (min_rate, max_rate) = SynthesisRequest::SAMPLE_RATE_RANGE;
        if !(min_rate..=max_rate).contains(&self.sample_rate_hz) {
            return Err(SynthesisError::invalid_request(format!(
                "sample rate must be between {} and {} Hz",
                min_rate, max_rate
            )));
        }

        self.tuning.validate().map_err(SynthesisError::InvalidTuning)?;

        Ok(SynthesisRequest {
            text: text.to_string(),
            language,
            voice_id: voice_id.to_string(),
            provider: self.provider,
            codec: self.codec,
            sample_rate_hz: self.sample_rate_hz,
            tuning: self.tuning.rounded(),
            enable_preprocessing: self.enable_preprocessing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_valid_request() {
        let request = SynthesisRequest::builder("  Hello  ", "en-in", "anushka")
            .codec(AudioCodec::Mp3)
            .sample_rate_hz(24000)
            .build()
            .unwrap();

        assert_eq!(request.text(), "Hello");
        assert_eq!(request.language().as_str(), "en-IN");
        assert_eq!(request.codec(), AudioCodec::Mp3);
        assert_eq!(request.sample_rate_hz(), 24000);
        assert!(request.provider().is_none());
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = SynthesisRequest::builder("   ", "en-IN", "anushka").build().unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidRequest(_)));
    }

    #[test]
    fn test_text_length_bound() {
        let err = SynthesisRequest::builder("abcdef", "en-IN", "anushka")
            .max_text_chars(5)
            .build()
            .unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidRequest(_)));
    }

    #[test]
    fn test_bad_language_and_rate_rejected() {
        assert!(SynthesisRequest::builder("Hi", "english", "anushka").build().is_err());
        assert!(SynthesisRequest::builder("Hi", "en-IN", "anushka")
            .sample_rate_hz(4000)
            .build()
            .is_err());
    }

    #[test]
    fn test_tuning_is_rounded_at_construction() {
        let build = |pitch: f32| {
            SynthesisRequest::builder("Hi", "en-IN", "anushka")
                .tuning(Tuning {
                    pitch: Some(pitch),
                    pace: Some(1.2549),
                    ..Default::default()
                })
                .build()
                .unwrap()
        };

        let high = build(0.104);
        let low = build(0.096);
        assert_eq!(high.tuning().pitch, Some(0.1));
        assert_eq!(high.tuning(), low.tuning());
        assert_eq!(high.tuning().pace, Some(1.25));
        assert_eq!(build(-0.001).tuning().pitch.map(f32::to_bits), Some(0.0f32.to_bits()));
    }

    #[test]
    fn test_out_of_limit_tuning_is_invalid_tuning() {
        let err = SynthesisRequest::builder("Hi", "en-IN", "anushka")
            .tuning(Tuning {
                loudness: Some(5.0),
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidTuning(_)));
    }
}
