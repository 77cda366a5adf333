//! HTTP Error Handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ApplicationError;
use crate::domain::synthesis::SynthesisError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const UNPROCESSABLE: i32 = 422;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const BAD_GATEWAY: i32 = 502;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// 请求合法但无法被任何供应商服务（音色 / 语言）
    Unprocessable(String),
    Internal(String),
    /// 主备供应商均失败
    BadGateway(String),
    ServiceUnavailable(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, i32, &str) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, errno::NOT_FOUND, msg.as_str()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, errno::BAD_REQUEST, msg.as_str()),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, errno::UNPROCESSABLE, msg.as_str())
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, errno::INTERNAL_ERROR, msg.as_str())
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, errno::BAD_GATEWAY, msg.as_str()),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, errno::SERVICE_UNAVAILABLE, msg.as_str())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, msg) = self.parts();

        if status.is_server_error() {
            tracing::error!(errno = code, error = %msg, "Request failed");
        } else {
            tracing::warn!(errno = code, error = %msg, "Request rejected");
        }

        let body = ErrorResponse::new(code, msg);
        (status, Json(body)).into_response()
    }
}

impl From<SynthesisError> for ApiError {
    fn from(e: SynthesisError) -> Self {
        match e {
            SynthesisError::InvalidRequest(_) | SynthesisError::InvalidTuning(_) => {
                ApiError::BadRequest(e.to_string())
            }
            SynthesisError::UnsupportedVoice(_) | SynthesisError::UnsupportedLanguage(_) => {
                ApiError::Unprocessable(e.to_string())
            }
            SynthesisError::SynthesisFailed { .. } => ApiError::BadGateway(e.to_string()),
            SynthesisError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{} not found: {}", resource_type, id))
            }
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::Synthesis(e) => e.into(),
            ApplicationError::CacheError(msg) => ApiError::Internal(msg),
            ApplicationError::ExternalServiceError(msg) => ApiError::ServiceUnavailable(msg),
            ApplicationError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}
