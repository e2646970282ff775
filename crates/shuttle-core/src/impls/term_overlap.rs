//! TermOverlapReranker - ローカルで動く reranking provider
//!
//! Scores each passage by the share of query terms it contains
//! (`|query ∩ passage| / |query|`). No network, no credentials; used by the
//! demo binary and by tests that need a real provider.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::ports::{ProviderError, RankedPassage, RerankCredentials, RerankingProvider};

#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapReranker;

impl TermOverlapReranker {
    pub fn new() -> Self {
        Self
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl RerankingProvider for TermOverlapReranker {
    fn name(&self) -> &str {
        "term-overlap"
    }

    /// One entry per passage, in passage order.
    async fn rerank(
        &self,
        query: &str,
        passages: &[String],
        _credentials: &RerankCredentials,
    ) -> Result<Vec<RankedPassage>, ProviderError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Err(ProviderError::Failed("query has no terms".to_string()));
        }

        Ok(passages
            .iter()
            .enumerate()
            .map(|(index, passage)| {
                let overlap = query_terms.intersection(&terms(passage)).count();
                RankedPassage::new(index, overlap as f32 / query_terms.len() as f32)
            })
            .collect())
    }
}
