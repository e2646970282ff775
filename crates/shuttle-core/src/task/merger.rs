//! Fusion of ranked result streams into one deduplicated candidate set.
//!
//! Each stream is walked in rank order (1-based). The first sighting of a
//! document inserts it; later sightings merge their scores into it, so a
//! document found by both the vector and the lexical read carries both
//! contributions. Documents without a usable passage are dropped from the
//! candidate set but counted.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::domain::{
    DocumentId, DocumentScores, InternalFault, RerankStats, ScoredDocument, TaskPayload,
};

/// Field holding the similarity a vector read returns with each document.
const SIMILARITY_FIELD: &str = "$similarity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Vector,
    Lexical,
}

impl StreamSource {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamSource::Vector => "vector",
            StreamSource::Lexical => "lexical",
        }
    }
}

/// Documents of one source, already in that source's rank order.
#[derive(Debug, Clone)]
pub struct RankedStream {
    pub source: StreamSource,
    pub documents: Vec<Value>,
}

impl RankedStream {
    pub fn vector(documents: Vec<Value>) -> Self {
        Self {
            source: StreamSource::Vector,
            documents,
        }
    }

    pub fn lexical(documents: Vec<Value>) -> Self {
        Self {
            source: StreamSource::Lexical,
            documents,
        }
    }

    /// Stream from the payload of a completed read. `None` for any other
    /// payload.
    pub fn from_payload(source: StreamSource, payload: &TaskPayload) -> Option<Self> {
        match payload {
            TaskPayload::Read { documents, .. } => Some(Self {
                source,
                documents: documents.clone(),
            }),
            _ => None,
        }
    }
}

/// Reads the rerank passage at a dotted path (`"$vectorize"`, `"body.text"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageExtractor {
    path: Vec<String>,
}

impl PassageExtractor {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// `None` when the field is missing, null, not a string or blank.
    pub fn extract(&self, document: &Value) -> Option<String> {
        let mut node = document;
        for segment in &self.path {
            node = node.get(segment)?;
        }
        let text = node.as_str()?;
        if text.trim().is_empty() {
            return None;
        }
        Some(text.to_string())
    }
}

impl Default for PassageExtractor {
    fn default() -> Self {
        Self::new("$vectorize")
    }
}

/// Output of [`ScoredDocumentMerger::finish`].
#[derive(Debug, Clone)]
pub struct MergedCandidates {
    /// Documents with a passage, in first-sighting order.
    pub candidates: Vec<ScoredDocument>,
    /// Ids of documents dropped for lacking a passage.
    pub dropped: Vec<DocumentId>,
    pub stats: RerankStats,
}

impl MergedCandidates {
    /// Passages in candidate order; index `i` belongs to `candidates[i]`.
    pub fn passages(&self) -> Vec<String> {
        self.candidates
            .iter()
            .filter_map(|c| c.passage().map(str::to_string))
            .collect()
    }
}

pub struct ScoredDocumentMerger {
    extractor: PassageExtractor,
    slots: HashMap<DocumentId, usize>,
    documents: Vec<ScoredDocument>,
    seen: usize,
}

impl ScoredDocumentMerger {
    pub fn new(extractor: PassageExtractor) -> Self {
        Self {
            extractor,
            slots: HashMap::new(),
            documents: Vec::new(),
            seen: 0,
        }
    }

    /// Adds one stream. A document without `_id`, or one that appears twice
    /// in the same stream, is a fault.
    pub fn add_stream(&mut self, stream: RankedStream) -> Result<(), InternalFault> {
        let source = stream.source;
        for (index, document) in stream.documents.into_iter().enumerate() {
            let rank = index as u32 + 1;
            let id = DocumentId::from_document(&document).ok_or(InternalFault::MissingDocumentId {
                stream: source.as_str(),
                rank,
            })?;
            let scores = match source {
                StreamSource::Vector => DocumentScores::from_vector(similarity(&document), rank)?,
                StreamSource::Lexical => DocumentScores::from_lexical(rank)?,
            };
            let passage = self.extractor.extract(&document);
            self.seen += 1;

            let sighting = ScoredDocument::new(id.clone(), document, passage, scores);
            match self.slots.get(&id) {
                Some(&slot) => self.documents[slot].absorb(sighting)?,
                None => {
                    self.slots.insert(id, self.documents.len());
                    self.documents.push(sighting);
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> MergedCandidates {
        let unique = self.documents.len();
        let (candidates, without_passage): (Vec<_>, Vec<_>) = self
            .documents
            .into_iter()
            .partition(|d| d.passage().is_some());
        let dropped: Vec<DocumentId> = without_passage.into_iter().map(|d| d.id().clone()).collect();

        let stats = RerankStats {
            seen: self.seen,
            unique,
            dropped: dropped.len(),
            sent: candidates.len(),
        };
        debug!(
            seen = stats.seen,
            unique = stats.unique,
            dropped = stats.dropped,
            "merged ranked streams"
        );
        MergedCandidates {
            candidates,
            dropped,
            stats,
        }
    }
}

fn similarity(document: &Value) -> Option<f32> {
    document
        .get(SIMILARITY_FIELD)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
}
