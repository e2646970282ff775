//! What a completed task hands to the page renderer.

use serde_json::Value;

use super::document::DocumentId;
use super::scored_document::ScoredDocument;

/// Counters describing one fusion/rerank pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankStats {
    /// Documents read across all streams, duplicates included.
    pub seen: usize,
    /// Distinct documents after merging.
    pub unique: usize,
    /// Distinct documents dropped for lacking a passage.
    pub dropped: usize,
    /// Passages sent to the reranking provider.
    pub sent: usize,
}

/// Payload of a completed task, one variant per kind of work.
#[derive(Debug, Clone)]
pub enum TaskPayload {
    /// One document written.
    Inserted { id: DocumentId },

    /// One update statement applied.
    Modified {
        matched: u64,
        modified: u64,
        upserted_id: Option<DocumentId>,
    },

    /// Rows removed.
    Deleted { count: u64 },

    /// One page of a read.
    Read {
        documents: Vec<Value>,
        paging_state: Option<String>,
    },

    /// DDL / schema description.
    Schema { description: Option<Value> },

    /// Fused and reranked candidates, already sorted and truncated.
    Reranked {
        documents: Vec<ScoredDocument>,
        stats: RerankStats,
    },
}

impl TaskPayload {
    pub fn name(&self) -> &'static str {
        match self {
            TaskPayload::Inserted { .. } => "inserted",
            TaskPayload::Modified { .. } => "modified",
            TaskPayload::Deleted { .. } => "deleted",
            TaskPayload::Read { .. } => "read",
            TaskPayload::Schema { .. } => "schema",
            TaskPayload::Reranked { .. } => "reranked",
        }
    }
}
