//! HTTP Layer - RESTful API
//!
//! 对外暴露合成、音色目录与缓存统计接口

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{build_router, HttpServer};
pub use state::{AppState, RequestDefaults};
