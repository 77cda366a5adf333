//! HTTP Handlers

mod cache;
mod ping;
mod tts;
mod voice;

pub use cache::*;
pub use ping::*;
pub use tts::*;
pub use voice::*;
