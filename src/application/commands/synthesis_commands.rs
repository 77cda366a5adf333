//! Synthesis Commands

use crate::domain::synthesis::{OptimizationLevel, SynthesisRequest};

/// 合成命令
#[derive(Debug, Clone)]
pub struct Synthesize {
    pub request: SynthesisRequest,
    pub level: OptimizationLevel,
}
