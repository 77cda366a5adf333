//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod http;
pub mod memory;
pub mod persistence;
pub mod worker;

pub use events::TelemetryPublisher;
pub use memory::InMemoryAudioCache;
pub use persistence::sled::{SledAudioCache, SledCacheConfig};
pub use worker::{CacheSweeper, CacheSweeperConfig};
