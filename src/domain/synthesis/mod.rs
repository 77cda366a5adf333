//! Synthesis Context - 合成限界上下文
//!
//! 职责:
//! - 合成请求（构造时校验，之后不可变）
//! - 编码、采样率、调音参数与优化等级/缓存层级
//! - 供应商错误与合成错误分类

mod errors;
mod outcome;
mod request;
mod value_objects;

pub use errors::{ProviderFailure, SynthesisError, VendorError};
pub use outcome::FallbackOutcome;
pub use request::{SynthesisRequest, SynthesisRequestBuilder};
pub use value_objects::{AudioCodec, CacheTier, OptimizationLevel, Tuning, TuningRange};
