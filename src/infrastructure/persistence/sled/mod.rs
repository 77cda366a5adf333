//! Sled Persistence - 持久化音频缓存

mod audio_cache;

pub use audio_cache::{SledAudioCache, SledCacheConfig};
