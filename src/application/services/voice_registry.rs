//! Voice Registry - 抽象音色目录
//!
//! 启动时从各供应商加载一次并在进程生命周期内缓存；
//! 只有运维显式 reload 时整体替换（copy-on-write），读路径无锁竞争

use futures_util::future::join_all;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::application::ports::TtsProviderPort;
use crate::domain::voice::{LanguageCode, ProviderId, VoiceError, VoiceGender, VoiceRecord};

/// 音色列表过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceFilter {
    pub language: Option<LanguageCode>,
    pub gender: Option<VoiceGender>,
}

impl VoiceFilter {
    fn matches(&self, record: &VoiceRecord) -> bool {
        let language_ok = self
            .language
            .as_ref()
            .map(|language| record.supports(language))
            .unwrap_or(true);
        let gender_ok = self
            .gender
            .map(|gender| record.gender == Some(gender))
            .unwrap_or(true);
        language_ok && gender_ok
    }
}

/// 一次 reload 的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadReport {
    /// 成功刷新的供应商及其音色数量
    pub refreshed: Vec<(ProviderId, usize)>,
    /// 刷新失败（保留旧记录）的供应商及原因
    pub failed: Vec<(ProviderId, String)>,
}

#[derive(Debug, Clone, Default)]
struct Catalog {
    voices: BTreeMap<ProviderId, Vec<VoiceRecord>>,
    languages: BTreeMap<ProviderId, BTreeSet<LanguageCode>>,
}

impl Catalog {
    fn set_provider(&mut self, provider: ProviderId, records: Vec<VoiceRecord>) {
        let languages = records
            .iter()
            .flat_map(|r| r.languages.iter().cloned())
            .collect();
        self.languages.insert(provider.clone(), languages);
        self.voices.insert(provider, records);
    }

    fn find(&self, voice_id: &str, provider: &ProviderId) -> Option<&VoiceRecord> {
        let records = self.voices.get(provider)?;
        // 抽象 ID 优先于原生 ID
        records
            .iter()
            .find(|r| r.voice_id.eq_ignore_ascii_case(voice_id.trim()))
            .or_else(|| records.iter().find(|r| r.answers_to(voice_id)))
    }
}

/// Voice Registry
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    catalog: RwLock<Arc<Catalog>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 从静态记录构建
    pub fn from_records(records: impl IntoIterator<Item = VoiceRecord>) -> Self {
        let mut grouped: BTreeMap<ProviderId, Vec<VoiceRecord>> = BTreeMap::new();
        for record in records {
            grouped.entry(record.provider.clone()).or_default().push(record);
        }

        let mut catalog = Catalog::default();
        for (provider, records) in grouped {
            catalog.set_provider(provider, dedup(records));
        }

        Self {
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }

    /// 从各供应商的音色列表接口加载
    ///
    /// 列表失败的供应商以空目录登记，并记录告警
    pub async fn load(providers: &[Arc<dyn TtsProviderPort>]) -> Self {
        let registry = Self::new();
        let report = registry.reload(providers).await;
        for (provider, error) in &report.failed {
            tracing::warn!(provider = %provider, error = %error, "Voice catalog unavailable at startup");
        }
        registry
    }

    /// 并发刷新所有供应商的目录
    ///
    /// 刷新失败的供应商保留旧记录
    pub async fn reload(&self, providers: &[Arc<dyn TtsProviderPort>]) -> ReloadReport {
        let listings = join_all(providers.iter().map(|provider| async move {
            (provider.provider_id().clone(), provider.list_voices().await)
        }))
        .await;

        let mut next = Catalog::clone(&self.snapshot());
        let mut report = ReloadReport::default();

        for (provider, listing) in listings {
            match listing {
                Ok(records) => {
                    let records: Vec<VoiceRecord> = records
                        .into_iter()
                        .filter(|r| r.provider == provider)
                        .collect();
                    let records = dedup(records);
                    tracing::info!(provider = %provider, voices = records.len(), "Voice catalog loaded");
                    report.refreshed.push((provider.clone(), records.len()));
                    next.set_provider(provider, records);
                }
                Err(e) => {
                    tracing::warn!(provider = %provider, error = %e, "Voice catalog reload failed, keeping previous records");
                    next.voices.entry(provider.clone()).or_default();
                    next.languages.entry(provider.clone()).or_default();
                    report.failed.push((provider, e.to_string()));
                }
            }
        }

        *self.catalog.write() = Arc::new(next);
        report
    }

    /// 注册或替换单条记录
    pub fn register(&self, record: VoiceRecord) {
        let mut catalog = self.catalog.write();
        let mut next = Catalog::clone(&catalog);

        let provider = record.provider.clone();
        let mut records = next.voices.remove(&provider).unwrap_or_default();
        records.retain(|r| r.voice_id != record.voice_id);
        records.push(record);
        next.set_provider(provider, records);

        *catalog = Arc::new(next);
    }

    /// 在指定供应商下解析音色（抽象 ID 或原生 ID）
    pub fn resolve(&self, voice_id: &str, provider: &ProviderId) -> Result<VoiceRecord, VoiceError> {
        let catalog = self.snapshot();
        if !catalog.voices.contains_key(provider) {
            return Err(VoiceError::UnknownProvider(provider.clone()));
        }
        catalog
            .find(voice_id, provider)
            .cloned()
            .ok_or_else(|| VoiceError::not_found(voice_id, provider))
    }

    /// 是否有任一供应商认识该音色
    pub fn knows_voice(&self, voice_id: &str) -> bool {
        let catalog = self.snapshot();
        catalog
            .voices
            .keys()
            .any(|provider| catalog.find(voice_id, provider).is_some())
    }

    pub fn supports_language(&self, provider: &ProviderId, language: &LanguageCode) -> bool {
        self.snapshot()
            .languages
            .get(provider)
            .map(|languages| languages.contains(language))
            .unwrap_or(false)
    }

    /// 列出音色；provider 为 None 时列出全部供应商
    pub fn list_voices(&self, provider: Option<&ProviderId>, filter: &VoiceFilter) -> Vec<VoiceRecord> {
        let catalog = self.snapshot();
        catalog
            .voices
            .iter()
            .filter(|(id, _)| provider.map(|p| p == *id).unwrap_or(true))
            .flat_map(|(_, records)| records.iter())
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    /// 该供应商下第一个支持此语言的音色
    pub fn first_voice_for_language(
        &self,
        provider: &ProviderId,
        language: &LanguageCode,
    ) -> Option<VoiceRecord> {
        self.snapshot()
            .voices
            .get(provider)?
            .iter()
            .find(|r| r.supports(language))
            .cloned()
    }

    /// 该供应商的默认音色：第一个 en-IN 音色
    pub fn default_voice(&self, provider: &ProviderId) -> Option<VoiceRecord> {
        self.first_voice_for_language(provider, &LanguageCode::en_in())
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        self.snapshot().voices.keys().cloned().collect()
    }

    /// 音色记录总数
    pub fn len(&self) -> usize {
        self.snapshot().voices.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<Catalog> {
        self.catalog.read().clone()
    }
}

/// 同一供应商下同一抽象 ID 只保留第一条
fn dedup(records: Vec<VoiceRecord>) -> Vec<VoiceRecord> {
    let mut seen = BTreeSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.voice_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::tts::FakeTtsClient;

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::parse(code).unwrap()
    }

    fn registry() -> VoiceRegistry {
        VoiceRegistry::from_records(vec![
            VoiceRecord::new(ProviderId::sarvam(), "anushka", "anushka", "Anushka")
                .with_gender(VoiceGender::Female)
                .with_languages(&["hi-IN", "en-IN"]),
            VoiceRecord::new(ProviderId::sarvam(), "karun", "karun", "Karun")
                .with_gender(VoiceGender::Male)
                .with_languages(&["ta-IN", "en-IN"]),
            VoiceRecord::new(ProviderId::elevenlabs(), "rachel", "21m00Tcm4TlvDq8ikWAM", "Rachel")
                .with_gender(VoiceGender::Female)
                .with_languages(&["en-IN", "en-US"]),
        ])
    }

    #[test]
    fn test_resolve_by_abstract_and_native_id() {
        let registry = registry();
        let record = registry.resolve("Rachel", &ProviderId::elevenlabs()).unwrap();
        assert_eq!(record.native_id, "21m00Tcm4TlvDq8ikWAM");

        let record = registry
            .resolve("21m00Tcm4TlvDq8ikWAM", &ProviderId::elevenlabs())
            .unwrap();
        assert_eq!(record.voice_id, "rachel");
    }

    #[test]
    fn test_resolve_missing_voice_and_provider() {
        let registry = registry();
        assert!(matches!(
            registry.resolve("rachel", &ProviderId::sarvam()),
            Err(VoiceError::NotFound { .. })
        ));
        assert!(matches!(
            registry.resolve("rachel", &ProviderId::new("azure")),
            Err(VoiceError::UnknownProvider(_))
        ));
        assert!(registry.knows_voice("rachel"));
        assert!(!registry.knows_voice("nobody"));
    }

    #[test]
    fn test_language_support_is_per_provider() {
        let registry = registry();
        assert!(registry.supports_language(&ProviderId::sarvam(), &lang("ta-IN")));
        assert!(!registry.supports_language(&ProviderId::elevenlabs(), &lang("ta-IN")));
        assert!(!registry.supports_language(&ProviderId::new("azure"), &lang("en-IN")));
    }

    #[test]
    fn test_list_voices_with_filter() {
        let registry = registry();
        let filter = VoiceFilter {
            language: Some(lang("en-IN")),
            gender: Some(VoiceGender::Female),
        };
        let all = registry.list_voices(None, &filter);
        assert_eq!(all.len(), 2);

        let sarvam = registry.list_voices(Some(&ProviderId::sarvam()), &VoiceFilter::default());
        assert_eq!(sarvam.len(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_first_voice_for_language() {
        let registry = registry();
        let voice = registry
            .first_voice_for_language(&ProviderId::sarvam(), &lang("ta-IN"))
            .unwrap();
        assert_eq!(voice.voice_id, "karun");
        assert!(registry
            .first_voice_for_language(&ProviderId::elevenlabs(), &lang("ta-IN"))
            .is_none());
    }

    #[test]
    fn test_default_voice_is_first_en_in_voice() {
        let registry = registry();
        assert_eq!(registry.default_voice(&ProviderId::sarvam()).unwrap().voice_id, "anushka");
        assert_eq!(registry.default_voice(&ProviderId::elevenlabs()).unwrap().voice_id, "rachel");
        assert!(registry.default_voice(&ProviderId::new("azure")).is_none());
    }

    #[test]
    fn test_register_replaces_same_voice() {
        let registry = registry();
        registry.register(
            VoiceRecord::new(ProviderId::sarvam(), "karun", "karun-v2", "Karun").with_languages(&["kn-IN"]),
        );
        let record = registry.resolve("karun", &ProviderId::sarvam()).unwrap();
        assert_eq!(record.native_id, "karun-v2");
        assert!(registry.supports_language(&ProviderId::sarvam(), &lang("kn-IN")));
        assert!(!registry.supports_language(&ProviderId::sarvam(), &lang("ta-IN")));
    }

    #[tokio::test]
    async fn test_reload_keeps_previous_records_on_failure() {
        let healthy = FakeTtsClient::new(ProviderId::sarvam())
            .with_voice(VoiceRecord::new(ProviderId::sarvam(), "meera", "meera", "Meera").with_languages(&["ml-IN"]))
            .arc();
        let broken = FakeTtsClient::new(ProviderId::elevenlabs()).arc();
        broken.fail_listing(true);

        let registry = registry();
        let providers: Vec<Arc<dyn TtsProviderPort>> = vec![healthy, broken];
        let report = registry.reload(&providers).await;

        assert_eq!(report.refreshed, vec![(ProviderId::sarvam(), 1)]);
        assert_eq!(report.failed.len(), 1);
        assert!(registry.resolve("anushka", &ProviderId::sarvam()).is_err());
        assert!(registry.resolve("meera", &ProviderId::sarvam()).is_ok());
        assert!(registry.resolve("rachel", &ProviderId::elevenlabs()).is_ok());
    }
}
