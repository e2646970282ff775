//! One candidate result carrying merged scores from possibly several streams.

use std::cmp::Ordering;

use serde_json::Value;

use super::document::DocumentId;
use super::errors::InternalFault;
use super::score::DocumentScores;

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    id: DocumentId,
    document: Value,
    passage: Option<String>,
    scores: DocumentScores,
}

impl ScoredDocument {
    pub fn new(
        id: DocumentId,
        document: Value,
        passage: Option<String>,
        scores: DocumentScores,
    ) -> Self {
        Self {
            id,
            document,
            passage,
            scores,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    /// Text to rerank on. `None` excludes the document from reranking.
    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    pub fn scores(&self) -> &DocumentScores {
        &self.scores
    }

    /// Merges another sighting of the same document into this one.
    ///
    /// The first sighting's payload is kept; scores are merged per source.
    pub fn merge(mut self, other: ScoredDocument) -> Result<ScoredDocument, InternalFault> {
        self.absorb(other)?;
        Ok(self)
    }

    /// In-place form of [`ScoredDocument::merge`].
    pub fn absorb(&mut self, other: ScoredDocument) -> Result<(), InternalFault> {
        self.scores = self.scores.merge(other.scores)?;
        if self.passage.is_none() {
            self.passage = other.passage;
        }
        Ok(())
    }

    /// Merges additional scores (e.g. the rerank score) into this document.
    pub fn merge_scores(&mut self, scores: DocumentScores) -> Result<(), InternalFault> {
        self.scores = self.scores.merge(scores)?;
        Ok(())
    }

    /// Document rendered for a response, optionally with a `$scores` object.
    pub fn render(&self, include_scores: bool) -> Value {
        let mut document = self.document.clone();
        if include_scores && let Value::Object(map) = &mut document {
            map.insert("$scores".to_string(), self.scores.to_json());
        }
        document
    }
}

impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Rerank score descending (missing scores last), then id.
impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_score = match (self.scores.rerank().value(), other.scores.rerank().value()) {
            (Some(a), Some(b)) => b.total_cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_score.then_with(|| self.id.cmp(&other.id))
    }
}
