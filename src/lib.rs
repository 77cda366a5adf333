//! Voxgate - 多供应商 TTS 合成网关
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Voice Context: 供应商、语言与音色记录
//! - Synthesis Context: 合成请求、编码、调音参数与错误分类
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsProvider, AudioCache, TelemetrySink）
//! - Services: 音色目录、缓存指纹、单飞合并与合成编排
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: Sarvam / ElevenLabs 客户端与测试用 Fake 客户端
//! - Memory / Persistence: 进程内与 Sled 音频缓存
//! - Events: 遥测事件发布
//! - Worker: 过期缓存清理
//! - HTTP: RESTful API

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
