//! Voice HTTP Handlers

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::application::{ListVoices, ReloadVoices};
use crate::infrastructure::http::dto::{
    ApiResponse, ListVoicesParams, ProviderReloadDto, ReloadVoicesDto, VoiceDto, VoiceListDto,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 列出音色
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListVoicesParams>,
) -> Result<Json<ApiResponse<VoiceListDto>>, ApiError> {
    let query = ListVoices {
        provider: params.provider,
        language: params.language,
        gender: params.gender,
    };

    let voices: Vec<VoiceDto> = state
        .list_voices_handler
        .handle(query)?
        .into_iter()
        .map(VoiceDto::from)
        .collect();

    Ok(Json(ApiResponse::success(VoiceListDto {
        total: voices.len(),
        voices,
    })))
}

/// 重新拉取音色目录
pub async fn reload_voices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ReloadVoicesDto>>, ApiError> {
    let result = state.reload_voices_handler.handle(ReloadVoices).await?;

    let refreshed = result.refreshed.into_iter().map(|(provider, count)| ProviderReloadDto {
        provider: provider.to_string(),
        voices: Some(count),
        error: None,
    });
    let failed = result.failed.into_iter().map(|(provider, error)| ProviderReloadDto {
        provider: provider.to_string(),
        voices: None,
        error: Some(error),
    });

    Ok(Json(ApiResponse::success(ReloadVoicesDto {
        total_voices: result.total_voices,
        providers: refreshed.chain(failed).collect(),
    })))
}
