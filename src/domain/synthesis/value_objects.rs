//! Synthesis Context - Value Objects

use serde::Serialize;

/// 音频编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Mp3,
    Linear16,
    Mulaw,
    Alaw,
    Opus,
    Flac,
    Aac,
    Wav,
}

impl AudioCodec {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "linear16" => Some(Self::Linear16),
            "mulaw" => Some(Self::Mulaw),
            "alaw" => Some(Self::Alaw),
            "opus" => Some(Self::Opus),
            "flac" => Some(Self::Flac),
            "aac" => Some(Self::Aac),
            "wav" => Some(Self::Wav),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Linear16 => "linear16",
            Self::Mulaw => "mulaw",
            Self::Alaw => "alaw",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::Aac => "aac",
            Self::Wav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Linear16 => "audio/L16",
            Self::Mulaw | Self::Alaw => "audio/basic",
            Self::Opus => "audio/opus",
            Self::Flac => "audio/flac",
            Self::Aac => "audio/aac",
            Self::Wav => "audio/wav",
        }
    }
}

impl Default for AudioCodec {
    fn default() -> Self {
        Self::Wav
    }
}

impl std::fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 优化等级（质量 ↔ 速度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    Quality,
    BalancedQuality,
    Balanced,
    BalancedSpeed,
    Speed,
}

impl OptimizationLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quality" => Some(Self::Quality),
            "balanced_quality" => Some(Self::BalancedQuality),
            "balanced" => Some(Self::Balanced),
            "balanced_speed" => Some(Self::BalancedSpeed),
            "speed" => Some(Self::Speed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::BalancedQuality => "balanced_quality",
            Self::Balanced => "balanced",
            Self::BalancedSpeed => "balanced_speed",
            Self::Speed => "speed",
        }
    }

    /// 映射到缓存 TTL 层级
    pub fn tier(&self) -> CacheTier {
        match self {
            Self::Quality | Self::BalancedQuality => CacheTier::Quality,
            Self::Balanced => CacheTier::Balanced,
            Self::BalancedSpeed | Self::Speed => CacheTier::Speed,
        }
    }
}

impl Default for OptimizationLevel {
    fn default() -> Self {
        Self::Balanced
    }
}

/// 缓存层级：写入时记录，决定条目 TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Quality,
    Balanced,
    Speed,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 调音参数
///
/// 请求级硬限制（超出即 InvalidTuning）:
/// - pitch: -1.0 ~ 1.0
/// - pace: 0.3 ~ 3.0
/// - loudness: 0.0 ~ 3.0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tuning {
    pub pitch: Option<f32>,
    pub pace: Option<f32>,
    pub loudness: Option<f32>,
}

impl Tuning {
    pub const PITCH_LIMITS: (f32, f32) = (-1.0, 1.0);
    pub const PACE_LIMITS: (f32, f32) = (0.3, 3.0);
    pub const LOUDNESS_LIMITS: (f32, f32) = (0.0, 3.0);

    pub fn validate(&self) -> Result<(), String> {
        check("pitch", self.pitch, Self::PITCH_LIMITS)?;
        check("pace", self.pace, Self::PACE_LIMITS)?;
        check("loudness", self.loudness, Self::LOUDNESS_LIMITS)?;
        Ok(())
    }

    /// 已设置的参数，按 key 字典序
    pub fn entries(&self) -> Vec<(&'static str, f32)> {
        [
            ("loudness", self.loudness),
            ("pace", self.pace),
            ("pitch", self.pitch),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pitch.is_none() && self.pace.is_none() && self.loudness.is_none()
    }

    /// 各参数四舍五入到 0.01；发往供应商的值与指纹使用的值一致
    pub fn rounded(&self) -> Self {
        Self {
            pitch: self.pitch.map(round_hundredths),
            pace: self.pace.map(round_hundredths),
            loudness: self.loudness.map(round_hundredths),
        }
    }
}

fn round_hundredths(value: f32) -> f32 {
    // + 0.0 把 -0.0 归并为 0.0
    (value * 100.0).round() / 100.0 + 0.0
}

fn check(name: &str, value: Option<f32>, (min, max): (f32, f32)) -> Result<(), String> {
    match value {
        Some(v) if !v.is_finite() => Err(format!("{} must be a finite number", name)),
        Some(v) if v < min || v > max => {
            Err(format!("{} must be between {} and {}, got {}", name, min, max, v))
        }
        _ => Ok(()),
    }
}

/// 供应商可接受的调音范围
///
/// `None` 表示该供应商不支持此参数，调用前直接丢弃
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningRange {
    pub pitch: Option<(f32, f32)>,
    pub pace: Option<(f32, f32)>,
    pub loudness: Option<(f32, f32)>,
}

impl TuningRange {
    pub fn clamp(&self, tuning: &Tuning) -> Tuning {
        Tuning {
            pitch: clamp_one(tuning.pitch, self.pitch),
            pace: clamp_one(tuning.pace, self.pace),
            loudness: clamp_one(tuning.loudness, self.loudness),
        }
    }
}

fn clamp_one(value: Option<f32>, range: Option<(f32, f32)>) -> Option<f32> {
    match (value, range) {
        (Some(v), Some((min, max))) => Some(v.clamp(min, max)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_to_tier_mapping() {
        assert_eq!(OptimizationLevel::Quality.tier(), CacheTier::Quality);
        assert_eq!(OptimizationLevel::BalancedQuality.tier(), CacheTier::Quality);
        assert_eq!(OptimizationLevel::Balanced.tier(), CacheTier::Balanced);
        assert_eq!(OptimizationLevel::BalancedSpeed.tier(), CacheTier::Speed);
        assert_eq!(OptimizationLevel::Speed.tier(), CacheTier::Speed);
    }

    #[test]
    fn test_codec_parse_and_mime() {
        assert_eq!(AudioCodec::parse("MP3"), Some(AudioCodec::Mp3));
        assert_eq!(AudioCodec::parse("ogg"), None);
        assert_eq!(AudioCodec::Wav.mime_type(), "audio/wav");
        assert_eq!(AudioCodec::Mulaw.mime_type(), "audio/basic");
    }

    #[test]
    fn test_tuning_limits() {
        assert!(Tuning::default().validate().is_ok());
        let tuning = Tuning {
            pitch: Some(1.5),
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
        let tuning = Tuning {
            pace: Some(f32::NAN),
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_range_clamps_and_drops() {
        let range = TuningRange {
            pitch: None,
            pace: Some((0.7, 1.2)),
            loudness: None,
        };
        let tuning = Tuning {
            pitch: Some(0.5),
            pace: Some(2.0),
            loudness: Some(1.0),
        };
        let clamped = range.clamp(&tuning);
        assert_eq!(clamped.pitch, None);
        assert_eq!(clamped.pace, Some(1.2));
        assert_eq!(clamped.loudness, None);
    }

    #[test]
    fn test_entries_are_sorted() {
        let tuning = Tuning {
            pitch: Some(0.1),
            pace: None,
            loudness: Some(1.0),
        };
        let keys: Vec<_> = tuning.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["loudness", "pitch"]);
    }
}
