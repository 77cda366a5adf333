//! HTTP Server
//!
//! 路由 + 中间件装配，监听并在关闭信号到来后等待在途请求结束

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 合成请求体上限（文本只有数千字符）
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// 预检请求缓存时间
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// HTTP 服务器
pub struct HttpServer {
    addr: String,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(addr: impl Into<String>, state: AppState) -> Self {
        Self {
            addr: addr.into(),
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// 启动服务器，`shutdown` 完成后优雅退出
    pub async fn serve<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let listener = TcpListener::bind(&self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

/// 组装路由与中间件
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    create_routes()
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(error_logging_middleware))
        .layer(trace)
        .layer(cors)
        .with_state(state)
}
