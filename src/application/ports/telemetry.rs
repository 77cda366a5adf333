//! Telemetry Port - 遥测事件出口
//!
//! 引擎只产生离散事件；聚合与暴露（如 Prometheus）由外部协作者负责

use serde::Serialize;

use crate::domain::synthesis::{CacheTier, FallbackOutcome};
use crate::domain::voice::ProviderId;

/// 遥测事件
///
/// 终态事件: `CacheHit`、`SynthesisFinished`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    RequestTotal {
        provider: ProviderId,
        tier: CacheTier,
    },
    CacheHit {
        provider: ProviderId,
        tier: CacheTier,
        latency_ms: u64,
    },
    CacheMiss {
        provider: ProviderId,
        tier: CacheTier,
    },
    VendorFailure {
        provider: ProviderId,
        tier: CacheTier,
        kind: &'static str,
        attempt: u32,
        will_retry: bool,
    },
    FallbackTransition {
        from: ProviderId,
        to: ProviderId,
        tier: CacheTier,
        reason: &'static str,
    },
    SynthesisFinished {
        outcome: FallbackOutcome,
        provider: ProviderId,
        tier: CacheTier,
        latency_ms: u64,
    },
}

impl TelemetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestTotal { .. } => "request_total",
            Self::CacheHit { .. } => "cache_hit",
            Self::CacheMiss { .. } => "cache_miss",
            Self::VendorFailure { .. } => "vendor_failure",
            Self::FallbackTransition { .. } => "fallback_transition",
            Self::SynthesisFinished { .. } => "synthesis_finished",
        }
    }
}

/// Telemetry Sink Port
///
/// 实现必须非阻塞；引擎从不读回事件
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}
