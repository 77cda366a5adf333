//! Synthesis Context - Fallback Outcome

use serde::Serialize;

/// 一次供应商调度的结局，随遥测事件上报，不持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackOutcome {
    PrimarySuccess,
    FallbackSuccess,
    BothFailed,
}

impl FallbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimarySuccess => "primary_success",
            Self::FallbackSuccess => "fallback_success",
            Self::BothFailed => "both_failed",
        }
    }
}
