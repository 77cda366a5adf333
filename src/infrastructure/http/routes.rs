//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping              GET   健康检查
//! - /api/tts/synthesize    POST  合成语音
//! - /api/voice/list        GET   列出音色（provider / language / gender 过滤）
//! - /api/voice/reload      POST  从各供应商重新拉取音色目录
//! - /api/cache/stats       GET   缓存统计

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/tts", tts_routes())
        .nest("/voice", voice_routes())
        .nest("/cache", cache_routes())
}

/// TTS 路由
fn tts_routes() -> Router<Arc<AppState>> {
    Router::new().route("/synthesize", post(handlers::synthesize))
}

/// Voice 路由
fn voice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", get(handlers::list_voices))
        .route("/reload", post(handlers::reload_voices))
}

/// Cache 路由
fn cache_routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(handlers::cache_stats))
}
