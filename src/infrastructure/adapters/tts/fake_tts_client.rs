//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 不实际调用外部服务；可编排延迟、失败序列与音色目录，并记录调用次数

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{TtsProviderPort, VendorAudio, VendorRequest};
use crate::domain::synthesis::{AudioCodec, VendorError};
use crate::domain::voice::{LanguageCode, ProviderId, VoiceRecord};

/// Fake TTS Client
///
/// 返回的音频内容为 `provider:native_voice_id:text`，便于断言由谁合成
pub struct FakeTtsClient {
    provider: ProviderId,
    voices: Vec<VoiceRecord>,
    languages: BTreeSet<LanguageCode>,
    unsupported_codecs: Vec<AudioCodec>,
    delay: Duration,
    /// 依次弹出的失败；为空后使用 persistent_failure
    scripted_failures: Mutex<VecDeque<VendorError>>,
    persistent_failure: Mutex<Option<VendorError>>,
    listing_fails: AtomicBool,
    calls: AtomicUsize,
    requests: Mutex<Vec<VendorRequest>>,
}

impl FakeTtsClient {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            voices: Vec::new(),
            languages: BTreeSet::new(),
            unsupported_codecs: Vec::new(),
            delay: Duration::ZERO,
            scripted_failures: Mutex::new(VecDeque::new()),
            persistent_failure: Mutex::new(None),
            listing_fails: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 登记音色，其语言计入供应商支持的语言
    pub fn with_voice(mut self, record: VoiceRecord) -> Self {
        self.languages.extend(record.languages.iter().cloned());
        self.voices.push(record);
        self
    }

    pub fn with_voices(self, records: impl IntoIterator<Item = VoiceRecord>) -> Self {
        records.into_iter().fold(self, Self::with_voice)
    }

    /// 声明目录之外额外支持的语言
    pub fn with_language(mut self, code: &str) -> Self {
        if let Ok(language) = LanguageCode::parse(code) {
            self.languages.insert(language);
        }
        self
    }

    /// 声明不能输出的编码
    pub fn without_codec(mut self, codec: AudioCodec) -> Self {
        self.unsupported_codecs.push(codec);
        self
    }

    /// 模拟合成耗时
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 追加一次性失败（按顺序消耗）
    pub fn push_failure(&self, error: VendorError) {
        self.scripted_failures.lock().push_back(error);
    }

    /// 之后每次调用都失败；None 恢复正常
    pub fn fail_always(&self, error: Option<VendorError>) {
        *self.persistent_failure.lock() = error;
    }

    /// 让 list_voices 失败
    pub fn fail_listing(&self, fail: bool) {
        self.listing_fails.store(fail, Ordering::SeqCst);
    }

    /// synthesize 被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<VendorRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<VendorRequest> {
        self.requests.lock().last().cloned()
    }

    fn next_failure(&self) -> Option<VendorError> {
        self.scripted_failures
            .lock()
            .pop_front()
            .or_else(|| self.persistent_failure.lock().clone())
    }
}

#[async_trait]
impl TtsProviderPort for FakeTtsClient {
    fn provider_id(&self) -> &ProviderId {
        &self.provider
    }

    async fn synthesize(&self, request: VendorRequest) -> Result<VendorAudio, VendorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        tracing::debug!(
            provider = %self.provider,
            voice = %request.native_voice_id,
            text_len = request.text.len(),
            "FakeTtsClient: synthesizing"
        );

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(error) = self.next_failure() {
            return Err(error);
        }

        let audio = format!("{}:{}:{}", self.provider, request.native_voice_id, request.text);
        Ok(VendorAudio {
            audio: Bytes::from(audio),
            codec: request.codec,
            sample_rate_hz: request.sample_rate_hz,
            request_id: Some(format!("fake-{}", uuid::Uuid::new_v4())),
        })
    }

    fn supports_language(&self, language: &LanguageCode) -> bool {
        self.languages.contains(language)
    }

    fn supports_codec(&self, codec: AudioCodec) -> bool {
        !self.unsupported_codecs.contains(&codec)
    }

    fn native_voice_for(&self, voice_id: &str) -> Option<String> {
        self.voices
            .iter()
            .find(|v| v.answers_to(voice_id))
            .map(|v| v.native_id.clone())
    }

    async fn list_voices(&self) -> Result<Vec<VoiceRecord>, VendorError> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(VendorError::Transient("voice listing unavailable".to_string()));
        }
        Ok(self.voices.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesis::{AudioCodec, Tuning};

    fn request() -> VendorRequest {
        VendorRequest {
            text: "Hello".into(),
            native_voice_id: "anushka".into(),
            language: LanguageCode::parse("en-IN").unwrap(),
            codec: AudioCodec::Wav,
            sample_rate_hz: 22050,
            tuning: Tuning::default(),
            enable_preprocessing: true,
        }
    }

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let client = FakeTtsClient::new(ProviderId::sarvam());
        client.push_failure(VendorError::Transient("reset".into()));

        assert!(client.synthesize(request()).await.is_err());
        let audio = client.synthesize(request()).await.unwrap();
        assert_eq!(&audio.audio[..], b"sarvam:anushka:Hello");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure() {
        let client = FakeTtsClient::new(ProviderId::sarvam());
        client.fail_always(Some(VendorError::Rejected("400".into())));
        assert!(client.synthesize(request()).await.is_err());
        assert!(client.synthesize(request()).await.is_err());

        client.fail_always(None);
        assert!(client.synthesize(request()).await.is_ok());
    }
}
