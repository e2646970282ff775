//! RerankingTask - fuse ranked streams, rerank the passages, keep the top N.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    Executable, MergedCandidates, PassageExtractor, RankedStream, ScoredDocumentMerger,
    TaskLifecycle,
};
use crate::app::ExecutionContext;
use crate::domain::{
    AttemptRecord, DocumentScores, InternalFault, TaskFailure, TaskId, TaskPayload, TaskStatus,
    Warning, WarningCode,
};
use crate::ports::{RankedPassage, RerankCredentials, RerankingProvider};

pub struct RerankingTask {
    lifecycle: TaskLifecycle,
    query: String,
    streams: Vec<RankedStream>,
    extractor: PassageExtractor,
    limit: Option<usize>,
    provider: Arc<dyn RerankingProvider>,
    credentials: RerankCredentials,
    payload: Option<TaskPayload>,
}

impl RerankingTask {
    pub fn new(
        id: TaskId,
        position: usize,
        query: impl Into<String>,
        streams: Vec<RankedStream>,
        provider: Arc<dyn RerankingProvider>,
    ) -> Self {
        Self {
            lifecycle: TaskLifecycle::new(id, position),
            query: query.into(),
            streams,
            extractor: PassageExtractor::default(),
            limit: None,
            provider,
            credentials: RerankCredentials::default(),
            payload: None,
        }
    }

    pub fn with_extractor(mut self, extractor: PassageExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Keep at most `limit` documents after reranking.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_credentials(mut self, credentials: RerankCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Checks the query and limit, then moves to `Ready` (or `Error`).
    pub fn prepare(&mut self) -> Result<(), InternalFault> {
        let invalid = if self.query.trim().is_empty() {
            Some("rerank query must not be blank")
        } else if self.limit == Some(0) {
            Some("rerank limit must be at least 1")
        } else {
            None
        };
        match invalid {
            Some(message) => self.lifecycle.fail(TaskFailure::invalid_input(message)),
            None => self.lifecycle.mark_ready(),
        }
    }

    pub fn prepared(mut self) -> Result<Self, InternalFault> {
        self.prepare()?;
        Ok(self)
    }

    fn merge_streams(&mut self) -> Result<MergedCandidates, InternalFault> {
        let mut merger = ScoredDocumentMerger::new(self.extractor.clone());
        for stream in std::mem::take(&mut self.streams) {
            merger.add_stream(stream)?;
        }
        Ok(merger.finish())
    }

    fn complete(&mut self, payload: TaskPayload) -> Result<(), InternalFault> {
        self.payload = Some(payload);
        self.lifecycle.transition(TaskStatus::Completed)
    }
}

/// Provider contract: one rank per passage, every index in range, no index
/// twice.
fn check_ranks(ranks: &[RankedPassage], passages: usize) -> Result<(), InternalFault> {
    if ranks.len() != passages {
        return Err(InternalFault::RankCountMismatch {
            passages,
            ranks: ranks.len(),
        });
    }
    let mut seen = HashSet::with_capacity(ranks.len());
    for ranked in ranks {
        if ranked.index >= passages {
            return Err(InternalFault::RankIndexOutOfRange {
                index: ranked.index,
                passages,
            });
        }
        if !seen.insert(ranked.index) {
            return Err(InternalFault::DuplicateRankIndex(ranked.index));
        }
    }
    Ok(())
}

#[async_trait]
impl Executable for RerankingTask {
    fn name(&self) -> &str {
        "rerank"
    }

    fn lifecycle(&self) -> &TaskLifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut TaskLifecycle {
        &mut self.lifecycle
    }

    fn payload(&self) -> Option<&TaskPayload> {
        self.payload.as_ref()
    }

    async fn execute(&mut self, _ctx: &ExecutionContext) -> Result<(), InternalFault> {
        let position = self.lifecycle.position();
        match self.lifecycle.status() {
            TaskStatus::Error => return Ok(()),
            TaskStatus::Ready => {}
            from => {
                return Err(InternalFault::IllegalTransition {
                    position,
                    from,
                    to: TaskStatus::InProgress,
                });
            }
        }
        self.lifecycle.transition(TaskStatus::InProgress)?;

        let merged = self.merge_streams()?;
        let stats = merged.stats;
        if !merged.dropped.is_empty() {
            self.lifecycle.add_warning(Warning::new(
                WarningCode::MissingRerankPassage,
                format!(
                    "{} document(s) had no passage at `{}` and were not reranked",
                    merged.dropped.len(),
                    self.extractor.path()
                ),
            ));
        }

        if merged.candidates.is_empty() {
            debug!(position, seen = stats.seen, "no passages to rerank");
            return self.complete(TaskPayload::Reranked {
                documents: Vec::new(),
                stats,
            });
        }

        let passages = merged.passages();
        info!(
            provider = self.provider.name(),
            position,
            seen = stats.seen,
            dropped = stats.dropped,
            sent = passages.len(),
            "reranking passages"
        );
        let ranks = match self
            .provider
            .rerank(&self.query, &passages, &self.credentials)
            .await
        {
            Ok(ranks) => {
                self.lifecycle.push_attempt(AttemptRecord::succeeded(1, None));
                ranks
            }
            Err(err) => {
                let failure = TaskFailure::from(err);
                self.lifecycle
                    .push_attempt(AttemptRecord::failed(1, None, failure.clone()));
                return self.lifecycle.fail(failure);
            }
        };
        check_ranks(&ranks, passages.len())?;

        let mut documents = merged.candidates;
        for ranked in &ranks {
            documents[ranked.index].merge_scores(DocumentScores::from_rerank(ranked.score))?;
        }
        documents.sort();
        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }
        self.complete(TaskPayload::Reranked { documents, stats })
    }
}
