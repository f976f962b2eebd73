pub mod claude;
pub mod noop;
pub mod prompt_builder;

use std::sync::Arc;

use crate::application::config::AnalysisConfig;
use crate::domain::ports::AnalysisService;

use self::claude::ClaudeCliService;
use self::noop::NoopAnalysisService;

/// Create the analysis service selected by configuration.
///
/// Returns [`NoopAnalysisService`] when analysis is disabled or the provider is unknown.
#[must_use]
pub fn create_analysis_service(config: &AnalysisConfig) -> Arc<dyn AnalysisService> {
    if !config.enabled {
        return Arc::new(NoopAnalysisService::new());
    }
    match config.provider.trim() {
        "claude-cli" => Arc::new(ClaudeCliService::new(
            config.claude_binary.clone(),
            config.model.clone(),
            config.timeout_secs,
        )),
        "noop" => Arc::new(NoopAnalysisService::new()),
        _ => {
            tracing::warn!(
                provider = %config.provider,
                "unknown analysis provider, falling back to noop"
            );
            Arc::new(NoopAnalysisService::new())
        }
    }
}
