//! Synthesis Command Handlers

use std::sync::Arc;

use crate::application::commands::Synthesize;
use crate::application::services::{SynthesisOrchestrator, SynthesisResult};
use crate::domain::synthesis::SynthesisError;

/// Synthesize Handler - 执行一次合成
pub struct SynthesizeHandler {
    orchestrator: Arc<SynthesisOrchestrator>,
}

impl SynthesizeHandler {
    pub fn new(orchestrator: Arc<SynthesisOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn handle(&self, cmd: Synthesize) -> Result<SynthesisResult, SynthesisError> {
        tracing::debug!(
            voice_id = %cmd.request.voice_id(),
            language = %cmd.request.language(),
            codec = %cmd.request.codec(),
            level = cmd.level.as_str(),
            chars = cmd.request.text().chars().count(),
            "Synthesize command received"
        );

        self.orchestrator.synthesize(cmd.request, cmd.level).await
    }
}
