//! Voice Command Handlers

use std::sync::Arc;

use crate::application::commands::{ReloadVoices, ReloadVoicesResponse};
use crate::application::error::ApplicationError;
use crate::application::services::SynthesisOrchestrator;

/// ReloadVoices Handler
pub struct ReloadVoicesHandler {
    orchestrator: Arc<SynthesisOrchestrator>,
}

impl ReloadVoicesHandler {
    pub fn new(orchestrator: Arc<SynthesisOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn handle(&self, _command: ReloadVoices) -> Result<ReloadVoicesResponse, ApplicationError> {
        let providers = self.orchestrator.providers();
        let registry = self.orchestrator.registry();
        let report = registry.reload(&providers).await;

        if report.refreshed.is_empty() && !report.failed.is_empty() {
            let reasons: Vec<String> = report
                .failed
                .iter()
                .map(|(provider, error)| format!("{}: {}", provider, error))
                .collect();
            return Err(ApplicationError::ExternalServiceError(reasons.join("; ")));
        }

        tracing::info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            total_voices = registry.len(),
            "Voice catalog reloaded"
        );

        Ok(ReloadVoicesResponse {
            refreshed: report.refreshed,
            failed: report.failed,
            total_voices: registry.len(),
        })
    }
}
