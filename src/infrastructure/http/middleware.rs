//! HTTP Middleware
//!
//! 记录 4xx / 5xx 响应及其耗时

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// HTTP 状态码错误日志中间件
///
/// 供应商双双失败（502）与内部错误按 error 记录，调用方错误按 warn 记录；
/// 业务错误码（errno）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::error::ApiError;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::util::ServiceExt;

    async fn ping() -> &'static str {
        "ok"
    }

    async fn exhausted() -> Result<(), ApiError> {
        Err(ApiError::BadGateway("sarvam: timeout; elevenlabs: 503".into()))
    }

    async fn invalid() -> Result<(), ApiError> {
        Err(ApiError::BadRequest("pitch out of range".into()))
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/ping", get(ping))
            .route("/exhausted", post(exhausted))
            .route("/invalid", post(invalid))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    async fn status_of(method: &str, uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        create_test_router().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_passes_responses_through() {
        assert_eq!(status_of("GET", "/ping").await, StatusCode::OK);
        assert_eq!(status_of("POST", "/invalid").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of("POST", "/exhausted").await, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        assert_eq!(status_of("GET", "/missing").await, StatusCode::NOT_FOUND);
    }
}
