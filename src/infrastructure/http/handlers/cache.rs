//! Cache HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::GetCacheStats;
use crate::infrastructure::http::dto::{ApiResponse, CacheStatsDto};
use crate::infrastructure::http::state::AppState;

/// 缓存统计
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<CacheStatsDto>> {
    let stats = state.cache_stats_handler.handle(GetCacheStats).await;
    Json(ApiResponse::success(CacheStatsDto::new(
        stats,
        state.orchestrator.in_flight(),
    )))
}
