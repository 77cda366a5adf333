//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 抽象音色 ID 与供应商原生音色记录
//! - 供应商标识、语言代码等值对象

mod errors;
mod record;
mod value_objects;

pub use errors::VoiceError;
pub use record::VoiceRecord;
pub use value_objects::{LanguageCode, ProviderId, VoiceGender};
