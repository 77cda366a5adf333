//! Application Services - 合成引擎核心组件
//!
//! - fingerprint: 请求指纹（缓存 key）
//! - coalescer: 同指纹请求单飞
//! - voice_registry: 抽象音色目录
//! - orchestrator: 解析音色 → 查缓存 → 单飞 → 主/备供应商 → 写缓存

mod coalescer;
mod fingerprint;
mod orchestrator;
mod voice_registry;

pub use coalescer::{CallRole, InFlightAborted, RequestCoalescer};
pub use fingerprint::CacheKey;
pub use orchestrator::{OrchestratorConfig, SynthesisOrchestrator, SynthesisResult};
pub use voice_registry::{ReloadReport, VoiceFilter, VoiceRegistry};
