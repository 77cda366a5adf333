//! Voice Commands

use crate::domain::voice::ProviderId;

/// 刷新音色目录命令（运维触发）
#[derive(Debug, Clone, Default)]
pub struct ReloadVoices;

/// 刷新结果
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadVoicesResponse {
    pub refreshed: Vec<(ProviderId, usize)>,
    pub failed: Vec<(ProviderId, String)>,
    pub total_voices: usize,
}
