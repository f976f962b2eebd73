use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::analysis::AnalysisContext;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analysis service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("invalid response from analysis service: {0}")]
    InvalidResponse(String),
    #[error("analysis timed out")]
    Timeout,
    #[error("analysis cancelled: {0}")]
    Cancelled(String),
}

/// External root-cause analysis service.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Analyze the host state captured in `context` and return free-form text.
    ///
    /// May take arbitrarily long; callers impose their own limits.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if the service is unavailable, the response is
    /// invalid, or the call timed out.
    async fn analyze(&self, context: &AnalysisContext) -> Result<String, AnalysisError>;
}
