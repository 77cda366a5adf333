//! Fingerprint Builder - 缓存 key 构造
//!
//! key = md5(规范化字段序列)，128 bit
//!
//! 规范化规则:
//! - text: 去除首尾空白后做 Unicode NFC 规范化
//! - language / provider / codec: 小写
//! - tuning: 只取已设置的参数，按 key 排序，四舍五入到 0.01
//! - 每个字段以 `长度:值` 写入，避免字段拼接产生歧义

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::domain::synthesis::SynthesisRequest;
use crate::domain::voice::ProviderId;

/// 调音参数保留的小数位（0.01）
const TUNING_SCALE: f32 = 100.0;

/// 请求指纹（32 位十六进制字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// 构造请求指纹
    ///
    /// 纯函数：相同的规范化输入永远得到相同的 key
    pub fn build(request: &SynthesisRequest, provider: &ProviderId, native_voice_id: &str) -> Self {
        let mut context = md5::Context::new();
        for field in canonical_fields(request, provider, native_voice_id) {
            context.consume(field.len().to_string().as_bytes());
            context.consume(b":");
            context.consume(field.as_bytes());
            context.consume(b";");
        }
        Self(format!("{:x}", context.compute()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_fields(
    request: &SynthesisRequest,
    provider: &ProviderId,
    native_voice_id: &str,
) -> Vec<String> {
    let mut fields = vec![
        request.text().trim().nfc().collect::<String>(),
        request.language().as_str().to_ascii_lowercase(),
        provider.as_str().to_ascii_lowercase(),
        native_voice_id.trim().to_string(),
        request.codec().as_str().to_ascii_lowercase(),
        request.sample_rate_hz().to_string(),
        request.enable_preprocessing().to_string(),
    ];
    for (name, value) in request.tuning().entries() {
        fields.push(format!("{}={}", name, quantize(value)));
    }
    fields
}

/// 0.01 精度的整数表示；-0.00 与 0.00 归并为同一值
fn quantize(value: f32) -> i64 {
    let scaled = (value * TUNING_SCALE).round() as i64;
    if scaled == 0 {
        0
    } else {
        scaled
    }
}
