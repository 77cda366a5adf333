//! Telemetry Publisher Implementation
//!
//! 遥测事件：写入 tracing 日志，并通过 broadcast 通道推送给外部聚合器

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{TelemetryEvent, TelemetrySink};

/// 广播通道容量；慢订阅者会丢失最旧的事件
const CHANNEL_CAPACITY: usize = 1024;

/// 遥测发布器
pub struct TelemetryPublisher {
    channel: broadcast::Sender<TelemetryEvent>,
}

impl TelemetryPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅遥测事件
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.channel.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.channel.receiver_count()
    }

    fn log(event: &TelemetryEvent) {
        match event {
            TelemetryEvent::RequestTotal { provider, tier } => {
                tracing::debug!(event = event.name(), provider = %provider, tier = %tier, "Telemetry");
            }
            TelemetryEvent::CacheHit { provider, tier, latency_ms }
            | TelemetryEvent::SynthesisFinished { provider, tier, latency_ms, .. } => {
                tracing::debug!(
                    event = event.name(),
                    provider = %provider,
                    tier = %tier,
                    latency_ms = *latency_ms,
                    "Telemetry"
                );
            }
            TelemetryEvent::CacheMiss { provider, tier } => {
                tracing::debug!(event = event.name(), provider = %provider, tier = %tier, "Telemetry");
            }
            TelemetryEvent::VendorFailure { provider, tier, kind, attempt, .. } => {
                tracing::debug!(
                    event = event.name(),
                    provider = %provider,
                    tier = %tier,
                    kind = *kind,
                    attempt = *attempt,
                    "Telemetry"
                );
            }
            TelemetryEvent::FallbackTransition { from, to, tier, reason } => {
                tracing::debug!(
                    event = event.name(),
                    from = %from,
                    to = %to,
                    tier = %tier,
                    reason = *reason,
                    "Telemetry"
                );
            }
        }
    }
}

impl TelemetrySink for TelemetryPublisher {
    fn emit(&self, event: TelemetryEvent) {
        Self::log(&event);
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Telemetry event dropped (no receivers)");
        }
    }
}

impl Default for TelemetryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesis::CacheTier;
    use crate::domain::voice::ProviderId;

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let publisher = TelemetryPublisher::new();
        let mut rx = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);

        publisher.emit(TelemetryEvent::CacheMiss {
            provider: ProviderId::sarvam(),
            tier: CacheTier::Speed,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "cache_miss");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "cache_miss");
        assert_eq!(json["provider"], "sarvam");
        assert_eq!(json["tier"], "speed");
    }

    #[test]
    fn test_emit_without_subscribers_does_not_fail() {
        let publisher = TelemetryPublisher::new();
        publisher.emit(TelemetryEvent::RequestTotal {
            provider: ProviderId::elevenlabs(),
            tier: CacheTier::Quality,
        });
    }
}
