//! TTS Adapter - 供应商客户端实现
//!
//! 所有 HTTP / 解码错误都在这里翻译为 `VendorError`

mod elevenlabs_tts_client;
mod fake_tts_client;
mod sarvam_tts_client;

pub use elevenlabs_tts_client::{ElevenLabsTtsClient, ElevenLabsTtsClientConfig};
pub use fake_tts_client::FakeTtsClient;
pub use sarvam_tts_client::{SarvamTtsClient, SarvamTtsClientConfig};

use reqwest::StatusCode;

use crate::domain::synthesis::VendorError;

/// 错误响应体最多保留的字符数
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP 状态码 → VendorError
///
/// 408 / 429 / 5xx 视为瞬时错误，其余 4xx 为拒绝
pub(crate) fn status_error(status: StatusCode, body: &str) -> VendorError {
    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), body.trim());

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        VendorError::Transient(message)
    } else {
        VendorError::Rejected(message)
    }
}

/// reqwest 传输层错误 → VendorError
pub(crate) fn transport_error(e: reqwest::Error) -> VendorError {
    if e.is_decode() {
        VendorError::InvalidResponse(e.to_string())
    } else if e.is_connect() {
        VendorError::Transient(format!("Cannot connect to vendor: {}", e))
    } else {
        VendorError::Transient(e.to_string())
    }
}
