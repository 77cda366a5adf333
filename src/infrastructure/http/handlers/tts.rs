//! TTS HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::Synthesize;
use crate::domain::synthesis::{AudioCodec, OptimizationLevel, SynthesisRequest, Tuning};
use crate::domain::voice::ProviderId;
use crate::infrastructure::http::dto::{ApiResponse, SynthesizeRequestDto, SynthesizeResponseDto};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 合成语音
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SynthesizeRequestDto>,
) -> Result<Json<ApiResponse<SynthesizeResponseDto>>, ApiError> {
    let level = match req.optimization_level.as_deref() {
        Some(raw) => OptimizationLevel::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown optimization level: {}", raw)))?,
        None => OptimizationLevel::default(),
    };

    let codec = match req.audio_codec.as_deref() {
        Some(raw) => AudioCodec::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown audio codec: {}", raw)))?,
        None => state.defaults.codec,
    };

    let mut builder = SynthesisRequest::builder(req.text, req.language_code, req.voice.voice_id)
        .codec(codec)
        .sample_rate_hz(req.sample_rate_hz.unwrap_or(state.defaults.sample_rate_hz))
        .tuning(Tuning {
            pitch: req.pitch,
            pace: req.pace,
            loudness: req.loudness,
        })
        .enable_preprocessing(req.enable_preprocessing)
        .max_text_chars(state.defaults.max_text_chars);

    if let Some(provider) = req.voice.provider.filter(|p| !p.trim().is_empty()) {
        builder = builder.provider(ProviderId::new(provider.trim()));
    }

    let request = builder.build()?;
    let language_code = request.language().to_string();

    tracing::debug!(
        voice_id = %request.voice_id(),
        language = %language_code,
        level = level.as_str(),
        "Synthesis requested"
    );

    let result = state
        .synthesize_handler
        .handle(Synthesize { request, level })
        .await?;

    Ok(Json(ApiResponse::success(SynthesizeResponseDto::from_result(
        result,
        language_code,
        level,
    ))))
}
