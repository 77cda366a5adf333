//! Memory Layer - In-Memory Audio Cache
//!
//! 进程内缓存实现；持久化后端不可用时的降级目标

mod audio_cache;

pub use audio_cache::{InMemoryAudioCache, DEFAULT_MAX_SIZE_BYTES};
