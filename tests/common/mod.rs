//! 集成测试共用的装配：两个 Fake 供应商 + 进程内缓存 + 遥测发布器

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use voxgate::application::{
    OrchestratorConfig, SynthesisOrchestrator, TierTtlTable, TtlPolicy, TtsProviderPort,
    VoiceRegistry,
};
use voxgate::domain::synthesis::SynthesisRequest;
use voxgate::domain::voice::{ProviderId, VoiceGender, VoiceRecord};
use voxgate::infrastructure::adapters::FakeTtsClient;
use voxgate::infrastructure::events::TelemetryPublisher;
use voxgate::infrastructure::memory::InMemoryAudioCache;

pub const ELEVENLABS_ANUSHKA: &str = "EXAVITQu4vr4xnSDxMaL";

pub struct Harness {
    pub sarvam: Arc<FakeTtsClient>,
    pub elevenlabs: Arc<FakeTtsClient>,
    pub cache: Arc<InMemoryAudioCache>,
    pub telemetry: Arc<TelemetryPublisher>,
    pub orchestrator: Arc<SynthesisOrchestrator>,
}

pub fn sarvam_voices() -> Vec<VoiceRecord> {
    vec![
        VoiceRecord::new(ProviderId::sarvam(), "anushka", "anushka", "Anushka")
            .with_gender(VoiceGender::Female)
            .with_languages(&["en-IN", "hi-IN"]),
        VoiceRecord::new(ProviderId::sarvam(), "abhilash", "abhilash", "Abhilash")
            .with_gender(VoiceGender::Male)
            .with_languages(&["en-IN", "hi-IN"]),
    ]
}

pub fn elevenlabs_voices() -> Vec<VoiceRecord> {
    vec![
        VoiceRecord::new(ProviderId::elevenlabs(), "anushka", ELEVENLABS_ANUSHKA, "Sarah")
            .with_gender(VoiceGender::Female)
            .with_languages(&["en-IN", "en-US", "ta-IN"]),
        VoiceRecord::new(ProviderId::elevenlabs(), "rachel", "21m00Tcm4TlvDq8ikWAM", "Rachel")
            .with_gender(VoiceGender::Female)
            .with_languages(&["en-IN", "en-US"]),
    ]
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        primary: ProviderId::sarvam(),
        fallback: Some(ProviderId::elevenlabs()),
        max_attempts: 2,
        retry_backoff: Duration::from_millis(1),
        vendor_timeout: Duration::from_secs(2),
    }
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_clients(
            FakeTtsClient::new(ProviderId::sarvam()),
            FakeTtsClient::new(ProviderId::elevenlabs()),
            test_config(),
        )
        .await
    }

    /// 主供应商带模拟耗时
    pub async fn with_primary_delay(delay: Duration, config: OrchestratorConfig) -> Self {
        Self::with_clients(
            FakeTtsClient::new(ProviderId::sarvam()).with_delay(delay),
            FakeTtsClient::new(ProviderId::elevenlabs()),
            config,
        )
        .await
    }

    /// 使用预先配置的 Fake 供应商，音色目录由此处补齐
    pub async fn with_clients(
        sarvam: FakeTtsClient,
        elevenlabs: FakeTtsClient,
        config: OrchestratorConfig,
    ) -> Self {
        let sarvam = sarvam.with_voices(sarvam_voices()).arc();
        let elevenlabs = elevenlabs.with_voices(elevenlabs_voices()).arc();

        let providers: Vec<Arc<dyn TtsProviderPort>> = vec![sarvam.clone(), elevenlabs.clone()];
        let registry = VoiceRegistry::load(&providers).await.arc();

        let ttl = Arc::new(TtlPolicy::new(TierTtlTable::default()));
        let cache = InMemoryAudioCache::new(16 * 1024 * 1024, ttl).arc();
        let telemetry = TelemetryPublisher::new().arc();

        let orchestrator = SynthesisOrchestrator::new(
            registry,
            providers,
            cache.clone(),
            telemetry.clone(),
            config,
        )
        .arc();

        Self {
            sarvam,
            elevenlabs,
            cache,
            telemetry,
            orchestrator,
        }
    }
}

pub fn request(text: &str, language: &str, voice: &str) -> SynthesisRequest {
    SynthesisRequest::builder(text, language, voice).build().unwrap()
}
