//! Ping Handler
//!
//! 健康检查，同时报告已加载的供应商与音色数量

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub providers: Vec<String>,
    pub voices: usize,
    pub telemetry_subscribers: usize,
}

/// Ping endpoint - 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    let registry = state.orchestrator.registry();
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        providers: registry.providers().iter().map(|p| p.to_string()).collect(),
        voices: registry.len(),
        telemetry_subscribers: state.telemetry.subscriber_count(),
    })
}
