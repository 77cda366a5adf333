//! Voice Context - Value Objects

use serde::Serialize;
use std::sync::Arc;

/// 供应商标识
///
/// 克隆开销低，可作为 HashMap key 在各组件间共享
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProviderId(Arc<str>);

impl ProviderId {
    pub const SARVAM: &'static str = "sarvam";
    pub const ELEVENLABS: &'static str = "elevenlabs";

    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref().trim().to_ascii_lowercase()))
    }

    pub fn sarvam() -> Self {
        Self::new(Self::SARVAM)
    }

    pub fn elevenlabs() -> Self {
        Self::new(Self::ELEVENLABS)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 语言代码（BCP-47 子集，形如 `en-IN`）
///
/// 不变量:
/// - 语言部分两位小写字母，地区部分两位大写字母
/// - 输入大小写不敏感，统一规范化
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn parse(code: &str) -> Result<Self, &'static str> {
        let (language, region) = code
            .trim()
            .split_once('-')
            .ok_or("语言代码必须形如 en-IN")?;

        let is_pair = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic());
        if !is_pair(language) || !is_pair(region) {
            return Err("语言代码必须形如 en-IN");
        }

        Ok(Self(format!(
            "{}-{}",
            language.to_ascii_lowercase(),
            region.to_ascii_uppercase()
        )))
    }

    /// 回退音色选择的兜底语言
    pub fn en_in() -> Self {
        Self("en-IN".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 音色性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
}

impl VoiceGender {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ProviderId::new(" ElevenLabs ")).unwrap();
        assert_eq!(json, "\"elevenlabs\"");
    }

    #[test]
    fn test_language_code_is_canonicalized() {
        let code = LanguageCode::parse(" EN-in ").unwrap();
        assert_eq!(code.as_str(), "en-IN");
        assert_eq!(code, LanguageCode::parse("en-IN").unwrap());
    }

    #[test]
    fn test_language_code_rejects_bad_shapes() {
        assert!(LanguageCode::parse("english").is_err());
        assert!(LanguageCode::parse("eng-IN").is_err());
        assert!(LanguageCode::parse("e1-IN").is_err());
        assert!(LanguageCode::parse("").is_err());
    }

    #[test]
    fn test_provider_id_is_lowercased() {
        assert_eq!(ProviderId::new("Sarvam"), ProviderId::sarvam());
        assert_eq!(ProviderId::from("ELEVENLABS").as_str(), "elevenlabs");
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(VoiceGender::parse("Female"), Some(VoiceGender::Female));
        assert_eq!(VoiceGender::parse("robot"), None);
    }
}
