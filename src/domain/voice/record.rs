//! Voice Context - VoiceRecord

use serde::Serialize;

use super::{LanguageCode, ProviderId, VoiceGender};

/// 供应商音色记录
///
/// 不变量:
/// - `voice_id` 为抽象音色 ID（小写），多个供应商可共享同一抽象 ID（别名关系）
/// - 同一供应商下，一个抽象 ID 只对应一条记录
/// - 进程生命周期内只读，仅在运维显式 reload 时整体替换
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceRecord {
    pub voice_id: String,
    pub provider: ProviderId,
    pub native_id: String,
    pub display_name: String,
    pub gender: Option<VoiceGender>,
    pub characteristics: Vec<String>,
    pub languages: Vec<LanguageCode>,
}

impl VoiceRecord {
    pub fn new(
        provider: ProviderId,
        voice_id: impl Into<String>,
        native_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            voice_id: voice_id.into().trim().to_lowercase(),
            provider,
            native_id: native_id.into(),
            display_name: display_name.into(),
            gender: None,
            characteristics: Vec::new(),
            languages: Vec::new(),
        }
    }

    pub fn with_gender(mut self, gender: VoiceGender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_characteristics(mut self, tags: &[&str]) -> Self {
        self.characteristics = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// 无法解析的语言代码会被忽略
    pub fn with_languages(mut self, codes: &[&str]) -> Self {
        self.languages = codes
            .iter()
            .filter_map(|c| LanguageCode::parse(c).ok())
            .collect();
        self
    }

    pub fn supports(&self, language: &LanguageCode) -> bool {
        self.languages.contains(language)
    }

    /// 抽象 ID 或原生 ID 均可命中，大小写不敏感
    pub fn answers_to(&self, id: &str) -> bool {
        let id = id.trim();
        self.voice_id.eq_ignore_ascii_case(id) || self.native_id.eq_ignore_ascii_case(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = VoiceRecord::new(ProviderId::elevenlabs(), "Rachel", "21m00Tcm4TlvDq8ikWAM", "Rachel")
            .with_gender(VoiceGender::Female)
            .with_languages(&["en-IN", "en-US", "bogus"]);

        assert_eq!(record.voice_id, "rachel");
        assert_eq!(record.languages.len(), 2);
        assert!(record.supports(&LanguageCode::parse("en-us").unwrap()));
        assert!(!record.supports(&LanguageCode::parse("hi-IN").unwrap()));
    }

    #[test]
    fn test_answers_to_abstract_and_native_ids() {
        let record = VoiceRecord::new(ProviderId::elevenlabs(), "rachel", "21m00Tcm4TlvDq8ikWAM", "Rachel");
        assert!(record.answers_to("RACHEL"));
        assert!(record.answers_to("21m00tcm4tlvdq8ikwam"));
        assert!(!record.answers_to("bella"));
    }
}
