//! Voice Queries

/// 列出音色查询
///
/// 所有条件均为原始字符串，由 handler 校验
#[derive(Debug, Clone, Default)]
pub struct ListVoices {
    pub provider: Option<String>,
    pub language: Option<String>,
    pub gender: Option<String>,
}
