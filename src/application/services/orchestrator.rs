//! Synthesis Orchestrator - 合成编排
//!
//! 状态流转:
//! ResolvingVoice → CacheLookup → (命中: Done) | (未命中: Coalescing)
//! → CallingPrimary → (成功: Caching) | (不支持/失败: CallingFallback)
//! → (成功: Caching) | (失败: Failed) → Done
//!
//! - 主供应商不支持请求语言或编码时直接跳过，不发起必然失败的网络调用
//! - 仅 `VendorError::Transient` 在 max_attempts 内重试，其余错误直接转备用
//! - 成功结果总是以原始请求的指纹写入缓存，与实际服务的供应商无关
//! - 两个供应商都失败时返回 SynthesisFailed，不写缓存

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::coalescer::{CallRole, RequestCoalescer};
use super::fingerprint::CacheKey;
use super::voice_registry::VoiceRegistry;
use crate::application::ports::{
    AudioCachePort, CacheEntry, CachedAudio, TelemetryEvent, TelemetrySink, TtsProviderPort,
    VendorAudio, VendorRequest,
};
use crate::domain::synthesis::{
    AudioCodec, CacheTier, FallbackOutcome, OptimizationLevel, ProviderFailure, SynthesisError,
    SynthesisRequest, VendorError,
};
use crate::domain::voice::{LanguageCode, ProviderId, VoiceRecord};

/// 编排参数
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub primary: ProviderId,
    pub fallback: Option<ProviderId>,
    /// 单个供应商的最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 第 n 次重试前等待 retry_backoff * n
    pub retry_backoff: Duration,
    /// 单次供应商调用的超时
    pub vendor_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            primary: ProviderId::sarvam(),
            fallback: Some(ProviderId::elevenlabs()),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(100),
            vendor_timeout: Duration::from_secs(15),
        }
    }
}

/// 合成结果
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub audio: Bytes,
    pub codec: AudioCodec,
    pub sample_rate_hz: u32,
    /// 实际提供音频的供应商
    pub provider: ProviderId,
    pub native_voice_id: String,
    pub tier: CacheTier,
    pub fingerprint: CacheKey,
    /// 由缓存直接返回
    pub cached: bool,
    /// 加入了其他请求发起的供应商调用
    pub coalesced: bool,
    /// 缓存命中时为 None
    pub outcome: Option<FallbackOutcome>,
    /// 发生回退时的原主供应商
    pub fallback_from: Option<ProviderId>,
    pub latency_ms: u64,
}

impl SynthesisResult {
    pub fn mime_type(&self) -> &'static str {
        self.codec.mime_type()
    }
}

/// 已解析到原生音色的调用目标
#[derive(Debug, Clone, PartialEq)]
struct Leg {
    provider: ProviderId,
    native_voice_id: String,
}

/// 一次请求的调度计划，进入 Coalescing 前确定
#[derive(Debug, Clone)]
struct DispatchPlan {
    primary: Result<Leg, ProviderFailure>,
    fallback: Option<Result<Leg, ProviderFailure>>,
}

/// 单飞 producer 的产出，在 leader 与所有 joined 调用方之间共享
#[derive(Debug, Clone)]
struct Dispatched {
    audio: Bytes,
    codec: AudioCodec,
    sample_rate_hz: u32,
    provider: ProviderId,
    native_voice_id: String,
    cached: bool,
    outcome: Option<FallbackOutcome>,
    fallback_from: Option<ProviderId>,
}

impl Dispatched {
    fn from_entry(entry: CacheEntry) -> Self {
        Self {
            audio: entry.audio.audio,
            codec: entry.audio.codec,
            sample_rate_hz: entry.audio.sample_rate_hz,
            provider: ProviderId::new(&entry.audio.provider),
            native_voice_id: entry.audio.native_voice_id,
            cached: true,
            outcome: None,
            fallback_from: None,
        }
    }
}

/// Synthesis Orchestrator
pub struct SynthesisOrchestrator {
    registry: Arc<VoiceRegistry>,
    coalescer: RequestCoalescer<Dispatched, SynthesisError>,
    dispatcher: Arc<Dispatcher>,
    primary: ProviderId,
    fallback: Option<ProviderId>,
}

impl SynthesisOrchestrator {
    pub fn new(
        registry: Arc<VoiceRegistry>,
        providers: Vec<Arc<dyn TtsProviderPort>>,
        cache: Arc<dyn AudioCachePort>,
        telemetry: Arc<dyn TelemetrySink>,
        config: OrchestratorConfig,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.provider_id().clone(), p))
            .collect();

        Self {
            registry,
            coalescer: RequestCoalescer::new(),
            dispatcher: Arc::new(Dispatcher {
                providers,
                cache,
                telemetry,
                max_attempts: config.max_attempts.max(1),
                retry_backoff: config.retry_backoff,
                vendor_timeout: config.vendor_timeout,
            }),
            primary: config.primary,
            fallback: config.fallback,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn registry(&self) -> &Arc<VoiceRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<dyn AudioCachePort> {
        &self.dispatcher.cache
    }

    /// 已注册的供应商适配器
    pub fn providers(&self) -> Vec<Arc<dyn TtsProviderPort>> {
        self.dispatcher.providers.values().cloned().collect()
    }

    /// 进行中的供应商调用数量
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight_len()
    }

    /// 执行一次合成
    pub async fn synthesize(
        &self,
        request: SynthesisRequest,
        level: OptimizationLevel,
    ) -> Result<SynthesisResult, SynthesisError> {
        let started = Instant::now();
        let tier = level.tier();
        let (primary, fallback) = self.providers_for(&request);

        // ResolvingVoice
        if !self.registry.knows_voice(request.voice_id()) {
            tracing::info!(voice_id = %request.voice_id(), "Voice unknown to every provider");
            return Err(SynthesisError::UnsupportedVoice(request.voice_id().to_string()));
        }

        self.dispatcher.emit(TelemetryEvent::RequestTotal {
            provider: primary.clone(),
            tier,
        });

        let plan = self.plan(&request, &primary, fallback.as_ref());
        if let (Err(primary_failure), None | Some(Err(_))) = (&plan.primary, &plan.fallback) {
            return Err(self.reject_unservable(&request, primary_failure, plan.fallback.as_ref(), tier, started));
        }

        // CacheLookup
        let requested_native = self.requested_native_voice(&request, &primary);
        let key = CacheKey::build(&request, &primary, &requested_native);

        match self.dispatcher.cache.get(key.as_str()).await {
            Ok(Some(entry)) => {
                let latency_ms = elapsed_ms(started);
                tracing::debug!(key = %key, provider = %entry.audio.provider, latency_ms, "Cache hit");
                let served = Dispatched::from_entry(entry);
                self.dispatcher.emit(TelemetryEvent::CacheHit {
                    provider: served.provider.clone(),
                    tier,
                    latency_ms,
                });
                return Ok(into_result(served, key, tier, false, latency_ms));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
            }
        }

        tracing::debug!(key = %key, provider = %primary, "Cache miss");
        self.dispatcher.emit(TelemetryEvent::CacheMiss {
            provider: primary.clone(),
            tier,
        });

        // Coalescing
        let dispatcher = self.dispatcher.clone();
        let base = VendorRequest::from_request(&request, &requested_native);
        let producer_key = key.clone();
        let (dispatched, role) = self
            .coalescer
            .join_or_start(key.as_str(), move || {
                dispatcher.run(producer_key, base, plan, tier, started)
            })
            .await;

        let dispatched = dispatched?;
        let coalesced = role == CallRole::Joined;
        if coalesced {
            tracing::debug!(key = %key, provider = %dispatched.provider, "Served by coalesced call");
        }

        Ok(into_result(dispatched, key, tier, coalesced, elapsed_ms(started)))
    }

    /// (主供应商, 备用供应商)
    ///
    /// 调用方指定了非默认主供应商时，默认主供应商成为备用
    fn providers_for(&self, request: &SynthesisRequest) -> (ProviderId, Option<ProviderId>) {
        let primary = request.provider().cloned().unwrap_or_else(|| self.primary.clone());
        let fallback = if primary == self.primary {
            self.fallback.clone()
        } else {
            Some(self.primary.clone())
        };
        let fallback = fallback.filter(|f| *f != primary);
        (primary, fallback)
    }

    fn plan(
        &self,
        request: &SynthesisRequest,
        primary: &ProviderId,
        fallback: Option<&ProviderId>,
    ) -> DispatchPlan {
        let primary_leg = self
            .plan_leg(primary, request.voice_id(), request.language())
            .and_then(|leg| self.check_codec(leg, request.codec()));
        if let Err(failure) = &primary_leg {
            tracing::info!(
                provider = %primary,
                language = %request.language(),
                reason = failure.error.kind(),
                "Skipping primary provider"
            );
        }

        let fallback_leg = fallback.map(|provider| {
            self.plan_leg(provider, request.voice_id(), request.language())
                .or_else(|failure| match failure.error {
                    VendorError::VoiceNotFound(_) | VendorError::UnsupportedLanguage(_) => self
                        .registry
                        .first_voice_for_language(provider, request.language())
                        .or_else(|| self.default_voice_if_served(provider, request.language()))
                        .map(|record| Leg {
                            provider: provider.clone(),
                            native_voice_id: record.native_id,
                        })
                        .ok_or(failure),
                    _ => Err(failure),
                })
                .and_then(|leg| self.check_codec(leg, request.codec()))
        });

        DispatchPlan {
            primary: primary_leg,
            fallback: fallback_leg,
        }
    }

    /// 在指定供应商上把抽象音色解析为可调用的原生音色
    fn plan_leg(
        &self,
        provider: &ProviderId,
        voice_id: &str,
        language: &LanguageCode,
    ) -> Result<Leg, ProviderFailure> {
        let fail = |error| ProviderFailure::new(provider.clone(), error);

        let adapter = self
            .dispatcher
            .providers
            .get(provider)
            .ok_or_else(|| fail(VendorError::NotConfigured(provider.clone())))?;

        let native_voice_id = match self.registry.resolve(voice_id, provider) {
            Ok(record) => {
                if !record.supports(language) || !self.registry.supports_language(provider, language) {
                    return Err(fail(VendorError::UnsupportedLanguage(language.clone())));
                }
                record.native_id
            }
            Err(_) => {
                let native = adapter
                    .native_voice_for(voice_id)
                    .ok_or_else(|| fail(VendorError::VoiceNotFound(voice_id.to_string())))?;
                if !adapter.supports_language(language) {
                    return Err(fail(VendorError::UnsupportedLanguage(language.clone())));
                }
                native
            }
        };

        Ok(Leg {
            provider: provider.clone(),
            native_voice_id,
        })
    }

    /// 目录中没有音色列出该语言但适配器声明支持时，使用该供应商的默认音色
    fn default_voice_if_served(&self, provider: &ProviderId, language: &LanguageCode) -> Option<VoiceRecord> {
        let adapter = self.dispatcher.providers.get(provider)?;
        if !adapter.supports_language(language) {
            return None;
        }
        self.registry.default_voice(provider)
    }

    /// 供应商无法输出请求的编码时跳过该供应商
    fn check_codec(&self, leg: Leg, codec: AudioCodec) -> Result<Leg, ProviderFailure> {
        match self.dispatcher.providers.get(&leg.provider) {
            Some(adapter) if !adapter.supports_codec(codec) => Err(ProviderFailure::new(
                leg.provider,
                VendorError::UnsupportedCodec(codec),
            )),
            _ => Ok(leg),
        }
    }

    /// 原始请求在主供应商上对应的原生音色，用于指纹
    fn requested_native_voice(&self, request: &SynthesisRequest, primary: &ProviderId) -> String {
        if let Ok(record) = self.registry.resolve(request.voice_id(), primary) {
            return record.native_id;
        }
        self.dispatcher
            .providers
            .get(primary)
            .and_then(|adapter| adapter.native_voice_for(request.voice_id()))
            .unwrap_or_else(|| request.voice_id().to_ascii_lowercase())
    }

    /// 没有任何可调用的供应商
    fn reject_unservable(
        &self,
        request: &SynthesisRequest,
        primary: &ProviderFailure,
        fallback: Option<&Result<Leg, ProviderFailure>>,
        tier: CacheTier,
        started: Instant,
    ) -> SynthesisError {
        let fallback = fallback.and_then(|leg| leg.as_ref().err()).cloned();
        let failures = std::iter::once(primary).chain(fallback.as_ref());

        let mut all_voice_missing = true;
        let mut all_language_missing = true;
        for failure in failures {
            all_voice_missing &= matches!(failure.error, VendorError::VoiceNotFound(_));
            all_language_missing &= matches!(failure.error, VendorError::UnsupportedLanguage(_));
        }

        if all_voice_missing {
            return SynthesisError::UnsupportedVoice(request.voice_id().to_string());
        }

        self.dispatcher.emit(TelemetryEvent::SynthesisFinished {
            outcome: FallbackOutcome::BothFailed,
            provider: primary.provider.clone(),
            tier,
            latency_ms: elapsed_ms(started),
        });

        if all_language_missing {
            tracing::warn!(language = %request.language(), "No provider serves the requested language");
            return SynthesisError::UnsupportedLanguage(request.language().clone());
        }

        tracing::error!(primary = %primary, "No provider available for request");
        SynthesisError::SynthesisFailed {
            primary: primary.clone(),
            fallback,
        }
    }
}

/// 供应商调用 + 缓存写入；在单飞 producer 中运行
struct Dispatcher {
    providers: HashMap<ProviderId, Arc<dyn TtsProviderPort>>,
    cache: Arc<dyn AudioCachePort>,
    telemetry: Arc<dyn TelemetrySink>,
    max_attempts: u32,
    retry_backoff: Duration,
    vendor_timeout: Duration,
}

impl Dispatcher {
    fn emit(&self, event: TelemetryEvent) {
        self.telemetry.emit(event);
    }

    async fn run(
        self: Arc<Self>,
        key: CacheKey,
        base: VendorRequest,
        plan: DispatchPlan,
        tier: CacheTier,
        started: Instant,
    ) -> Result<Dispatched, SynthesisError> {
        // 上一次调用可能已在 lookup 与登记之间写入缓存
        if let Ok(Some(entry)) = self.cache.get(key.as_str()).await {
            let latency_ms = elapsed_ms(started);
            tracing::debug!(key = %key, provider = %entry.audio.provider, latency_ms, "Cache hit on producer re-check");
            let served = Dispatched::from_entry(entry);
            self.emit(TelemetryEvent::CacheHit {
                provider: served.provider.clone(),
                tier,
                latency_ms,
            });
            return Ok(served);
        }

        let primary_failure = match plan.primary {
            Ok(leg) => match self.call_with_retry(&leg, &base, tier).await {
                Ok(audio) => {
                    return Ok(self
                        .finish(&key, leg, audio, FallbackOutcome::PrimarySuccess, None, tier, started)
                        .await)
                }
                Err(error) => ProviderFailure::new(leg.provider, error),
            },
            Err(failure) => failure,
        };

        let fallback_leg = match plan.fallback {
            Some(Ok(leg)) => leg,
            Some(Err(failure)) => return Err(self.failed(primary_failure, Some(failure), tier, started)),
            None => return Err(self.failed(primary_failure, None, tier, started)),
        };

        tracing::warn!(
            from = %primary_failure.provider,
            to = %fallback_leg.provider,
            reason = %primary_failure.error,
            "Falling back to secondary provider"
        );
        self.emit(TelemetryEvent::FallbackTransition {
            from: primary_failure.provider.clone(),
            to: fallback_leg.provider.clone(),
            tier,
            reason: primary_failure.error.kind(),
        });

        match self.call_with_retry(&fallback_leg, &base, tier).await {
            Ok(audio) => Ok(self
                .finish(
                    &key,
                    fallback_leg,
                    audio,
                    FallbackOutcome::FallbackSuccess,
                    Some(primary_failure.provider),
                    tier,
                    started,
                )
                .await),
            Err(error) => {
                let fallback_failure = ProviderFailure::new(fallback_leg.provider, error);
                Err(self.failed(primary_failure, Some(fallback_failure), tier, started))
            }
        }
    }

    /// 每次尝试都有独立超时；超时不重试
    async fn call_with_retry(
        &self,
        leg: &Leg,
        base: &VendorRequest,
        tier: CacheTier,
    ) -> Result<VendorAudio, VendorError> {
        let adapter = self
            .providers
            .get(&leg.provider)
            .ok_or_else(|| VendorError::NotConfigured(leg.provider.clone()))?;

        let request = VendorRequest {
            native_voice_id: leg.native_voice_id.clone(),
            ..base.clone()
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.vendor_timeout, adapter.synthesize(request.clone())).await {
                Ok(Ok(audio)) if audio.audio.is_empty() => {
                    Err(VendorError::InvalidResponse("empty audio payload".to_string()))
                }
                Ok(result) => result,
                Err(_) => Err(VendorError::Timeout(self.vendor_timeout)),
            };

            let error = match result {
                Ok(audio) => return Ok(audio),
                Err(error) => error,
            };

            let will_retry = error.is_retryable() && attempt < self.max_attempts;
            tracing::warn!(
                provider = %leg.provider,
                attempt,
                will_retry,
                error = %error,
                "Vendor call failed"
            );
            self.emit(TelemetryEvent::VendorFailure {
                provider: leg.provider.clone(),
                tier,
                kind: error.kind(),
                attempt,
                will_retry,
            });

            if !will_retry {
                return Err(error);
            }
            tokio::time::sleep(self.retry_backoff * attempt).await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        key: &CacheKey,
        leg: Leg,
        audio: VendorAudio,
        outcome: FallbackOutcome,
        fallback_from: Option<ProviderId>,
        tier: CacheTier,
        started: Instant,
    ) -> Dispatched {
        let cached = CachedAudio {
            audio: audio.audio.clone(),
            codec: audio.codec,
            sample_rate_hz: audio.sample_rate_hz,
            provider: leg.provider.to_string(),
            native_voice_id: leg.native_voice_id.clone(),
        };
        if let Err(e) = self.cache.put(key.as_str(), cached, tier).await {
            tracing::warn!(key = %key, backend = self.cache.backend_name(), error = %e, "Failed to cache synthesized audio");
        }

        let latency_ms = elapsed_ms(started);
        tracing::info!(
            key = %key,
            provider = %leg.provider,
            outcome = outcome.as_str(),
            vendor_request_id = ?audio.request_id,
            bytes = audio.audio.len(),
            latency_ms,
            "Synthesis completed"
        );
        self.emit(TelemetryEvent::SynthesisFinished {
            outcome,
            provider: leg.provider.clone(),
            tier,
            latency_ms,
        });

        Dispatched {
            audio: audio.audio,
            codec: audio.codec,
            sample_rate_hz: audio.sample_rate_hz,
            provider: leg.provider,
            native_voice_id: leg.native_voice_id,
            cached: false,
            outcome: Some(outcome),
            fallback_from,
        }
    }

    fn failed(
        &self,
        primary: ProviderFailure,
        fallback: Option<ProviderFailure>,
        tier: CacheTier,
        started: Instant,
    ) -> SynthesisError {
        self.emit(TelemetryEvent::SynthesisFinished {
            outcome: FallbackOutcome::BothFailed,
            provider: primary.provider.clone(),
            tier,
            latency_ms: elapsed_ms(started),
        });

        let error = SynthesisError::SynthesisFailed { primary, fallback };
        tracing::error!(error = %error, "Synthesis failed on every provider");
        error
    }
}

fn into_result(
    served: Dispatched,
    fingerprint: CacheKey,
    tier: CacheTier,
    coalesced: bool,
    latency_ms: u64,
) -> SynthesisResult {
    SynthesisResult {
        audio: served.audio,
        codec: served.codec,
        sample_rate_hz: served.sample_rate_hz,
        provider: served.provider,
        native_voice_id: served.native_voice_id,
        tier,
        fingerprint,
        cached: served.cached,
        coalesced,
        outcome: served.outcome,
        fallback_from: served.fallback_from,
        latency_ms,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
