//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Voice Context: 抽象音色与各供应商原生音色的映射
//! - Synthesis Context: 合成请求、编码/采样率、调音参数与错误分类

pub mod synthesis;
pub mod voice;
