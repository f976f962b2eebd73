use std::fmt::Write;

use async_trait::async_trait;

use crate::domain::entities::AnalysisContext;
use crate::domain::ports::{AnalysisError, AnalysisService};

/// Analysis service that never leaves the host.
///
/// Returns a short summary of the context so records are still written when
/// no provider is configured.
pub struct NoopAnalysisService;

impl NoopAnalysisService {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for NoopAnalysisService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisService for NoopAnalysisService {
    async fn analyze(&self, context: &AnalysisContext) -> Result<String, AnalysisError> {
        let mut text = format!(
            "Local summary: CPU {:.1}% (5-min average {:.1}%)",
            context.cpu_usage_percent, context.five_minute_average
        );
        if let Some(memory) = context.memory_usage_percent {
            let _ = write!(text, ", memory {memory:.1}%");
        }
        text.push_str("\nNo analysis provider is configured.\n\nTop processes:\n");
        text.push_str(&context.top_processes);
        if let Some(disk) = &context.disk_alert {
            let _ = write!(text, "\n\nDisk alerts:\n{disk}");
        }
        Ok(text)
    }
}
