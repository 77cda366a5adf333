//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    ReloadVoicesHandler, SynthesizeHandler,
    // Query handlers
    GetCacheStatsHandler, ListVoicesHandler,
    // Services
    SynthesisOrchestrator,
};
use crate::domain::synthesis::{AudioCodec, SynthesisRequest};
use crate::infrastructure::events::TelemetryPublisher;

/// 请求未显式指定时使用的合成参数
#[derive(Debug, Clone, Copy)]
pub struct RequestDefaults {
    pub codec: AudioCodec,
    pub sample_rate_hz: u32,
    pub max_text_chars: usize,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            codec: AudioCodec::default(),
            sample_rate_hz: SynthesisRequest::DEFAULT_SAMPLE_RATE,
            max_text_chars: SynthesisRequest::DEFAULT_MAX_TEXT_CHARS,
        }
    }
}

/// 应用状态
pub struct AppState {
    pub orchestrator: Arc<SynthesisOrchestrator>,
    pub telemetry: Arc<TelemetryPublisher>,
    pub defaults: RequestDefaults,

    // ========== Command Handlers ==========
    pub synthesize_handler: SynthesizeHandler,
    pub reload_voices_handler: ReloadVoicesHandler,

    // ========== Query Handlers ==========
    pub list_voices_handler: ListVoicesHandler,
    pub cache_stats_handler: GetCacheStatsHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        orchestrator: Arc<SynthesisOrchestrator>,
        telemetry: Arc<TelemetryPublisher>,
        defaults: RequestDefaults,
    ) -> Self {
        Self {
            // Command handlers
            synthesize_handler: SynthesizeHandler::new(orchestrator.clone()),
            reload_voices_handler: ReloadVoicesHandler::new(orchestrator.clone()),

            // Query handlers
            list_voices_handler: ListVoicesHandler::new(orchestrator.registry().clone()),
            cache_stats_handler: GetCacheStatsHandler::new(orchestrator.cache().clone()),

            orchestrator,
            telemetry,
            defaults,
        }
    }
}
