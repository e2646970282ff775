//! RerankingProvider port - rerank(query, passages) -> ranks.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FailureKind, TaskFailure};

/// Credentials forwarded to the reranking provider.
#[derive(Clone, Default)]
pub struct RerankCredentials {
    pub api_key: Option<String>,
}

impl RerankCredentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
        }
    }
}

impl fmt::Debug for RerankCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RerankCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Score for one passage, addressed by its index in the request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub index: usize,
    pub score: f32,
}

impl RankedPassage {
    pub fn new(index: usize, score: f32) -> Self {
        Self { index, score }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("reranking provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("reranking provider timed out: {0}")]
    Timeout(String),

    #[error("reranking provider error: {0}")]
    Failed(String),
}

impl From<ProviderError> for TaskFailure {
    fn from(err: ProviderError) -> Self {
        TaskFailure::new(FailureKind::RerankingFailed, err.to_string())
    }
}

/// Contract: the returned list has exactly one entry per passage, and every
/// `index` is within `0..passages.len()`.
#[async_trait]
pub trait RerankingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn rerank(
        &self,
        query: &str,
        passages: &[String],
        credentials: &RerankCredentials,
    ) -> Result<Vec<RankedPassage>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_the_key() {
        let creds = RerankCredentials::api_key("secret-token");
        let shown = format!("{creds:?}");
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("***"));
    }

    #[test]
    fn provider_error_becomes_reranking_failure() {
        let failure: TaskFailure = ProviderError::Timeout("5s".into()).into();
        assert_eq!(failure.kind, FailureKind::RerankingFailed);
        assert!(failure.message.contains("5s"));
    }
}
