//! Source-tagged relevance signals used when fusing ranked streams.
//!
//! - [`Score`] is a magnitude: larger is better.
//! - [`Rank`] is a 1-based position: smaller is better.
//!
//! Each value is tagged with the source that produced it and an `exists` flag.
//! One producer per source per document: merging two existing values of the
//! same source is a fault, and values of different sources never mix.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::InternalFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    /// Vector similarity search.
    Vector,
    /// Lexical (BM25) search.
    Lexical,
    /// External reranking model.
    Reranking,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Vector => "VECTOR",
            Source::Lexical => "LEXICAL",
            Source::Reranking => "RERANKING",
        }
    }
}

fn check_same_source(left: Source, right: Source) -> Result<(), InternalFault> {
    if left == right {
        Ok(())
    } else {
        Err(InternalFault::SourceMismatch {
            left: left.as_str(),
            right: right.as_str(),
        })
    }
}

/// Larger-is-better signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    source: Source,
    value: Option<f32>,
}

impl Score {
    pub fn new(source: Source, value: f32) -> Self {
        Self {
            source,
            value: Some(value),
        }
    }

    /// The non-existing value; identity of `merge`.
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            value: None,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    /// Returns whichever side exists.
    pub fn merge(self, other: Score) -> Result<Score, InternalFault> {
        check_same_source(self.source, other.source)?;
        match (self.exists(), other.exists()) {
            (true, true) => Err(InternalFault::AmbiguousMerge {
                source_name: self.source.as_str(),
            }),
            (false, true) => Ok(other),
            _ => Ok(self),
        }
    }

    /// Best-first ordering: `Less` means `self` ranks ahead of `other`.
    /// Existing values rank ahead of missing ones.
    pub fn try_cmp(&self, other: &Score) -> Result<Ordering, InternalFault> {
        check_same_source(self.source, other.source)?;
        Ok(match (self.value, other.value) {
            (Some(a), Some(b)) => b.total_cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

/// Smaller-is-better, 1-based position in a source's result stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    source: Source,
    rank: Option<u32>,
}

impl Rank {
    pub fn new(source: Source, rank: u32) -> Result<Self, InternalFault> {
        if rank == 0 {
            return Err(InternalFault::InvalidRank(rank));
        }
        Ok(Self {
            source,
            rank: Some(rank),
        })
    }

    pub fn empty(source: Source) -> Self {
        Self { source, rank: None }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn exists(&self) -> bool {
        self.rank.is_some()
    }

    pub fn value(&self) -> Option<u32> {
        self.rank
    }

    pub fn merge(self, other: Rank) -> Result<Rank, InternalFault> {
        check_same_source(self.source, other.source)?;
        match (self.exists(), other.exists()) {
            (true, true) => Err(InternalFault::AmbiguousMerge {
                source_name: self.source.as_str(),
            }),
            (false, true) => Ok(other),
            _ => Ok(self),
        }
    }

    /// Best-first ordering: earlier ranks first, missing ranks last.
    pub fn try_cmp(&self, other: &Rank) -> Result<Ordering, InternalFault> {
        check_same_source(self.source, other.source)?;
        Ok(match (self.rank, other.rank) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

/// All signals collected for one document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentScores {
    vector: Score,
    vector_rank: Rank,
    lexical_rank: Rank,
    rerank: Score,
}

impl Default for DocumentScores {
    fn default() -> Self {
        Self::empty()
    }
}

impl DocumentScores {
    pub fn empty() -> Self {
        Self {
            vector: Score::empty(Source::Vector),
            vector_rank: Rank::empty(Source::Vector),
            lexical_rank: Rank::empty(Source::Lexical),
            rerank: Score::empty(Source::Reranking),
        }
    }

    /// Sighting in the vector stream at `rank`, with the similarity if the
    /// read returned one.
    pub fn from_vector(similarity: Option<f32>, rank: u32) -> Result<Self, InternalFault> {
        Ok(Self {
            vector: similarity.map_or(Score::empty(Source::Vector), |s| {
                Score::new(Source::Vector, s)
            }),
            vector_rank: Rank::new(Source::Vector, rank)?,
            ..Self::empty()
        })
    }

    /// Sighting in the lexical stream at `rank`.
    pub fn from_lexical(rank: u32) -> Result<Self, InternalFault> {
        Ok(Self {
            lexical_rank: Rank::new(Source::Lexical, rank)?,
            ..Self::empty()
        })
    }

    pub fn from_rerank(score: f32) -> Self {
        Self {
            rerank: Score::new(Source::Reranking, score),
            ..Self::empty()
        }
    }

    pub fn merge(self, other: DocumentScores) -> Result<DocumentScores, InternalFault> {
        Ok(Self {
            vector: self.vector.merge(other.vector)?,
            vector_rank: self.vector_rank.merge(other.vector_rank)?,
            lexical_rank: self.lexical_rank.merge(other.lexical_rank)?,
            rerank: self.rerank.merge(other.rerank)?,
        })
    }

    pub fn vector(&self) -> Score {
        self.vector
    }

    pub fn vector_rank(&self) -> Rank {
        self.vector_rank
    }

    pub fn lexical_rank(&self) -> Rank {
        self.lexical_rank
    }

    pub fn rerank(&self) -> Score {
        self.rerank
    }

    /// `$scores` object for responses; only existing signals are included.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(v) = self.rerank.value() {
            map.insert("$rerank".to_string(), Value::from(v));
        }
        if let Some(v) = self.vector.value() {
            map.insert("$vector".to_string(), Value::from(v));
        }
        if let Some(r) = self.vector_rank.value() {
            map.insert("$vectorRank".to_string(), Value::from(r));
        }
        if let Some(r) = self.lexical_rank.value() {
            map.insert("$lexicalRank".to_string(), Value::from(r));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_existing_with_empty_keeps_existing() {
        let a = Score::new(Source::Vector, 0.5);
        let b = Score::empty(Source::Vector);
        assert_eq!(a.merge(b).unwrap(), a);
        assert_eq!(b.merge(a).unwrap(), a);
    }

    #[test]
    fn merge_two_empties_is_empty() {
        let merged = Rank::empty(Source::Lexical)
            .merge(Rank::empty(Source::Lexical))
            .unwrap();
        assert!(!merged.exists());
    }

    #[test]
    fn merge_two_existing_faults() {
        let a = Score::new(Source::Reranking, 0.1);
        let b = Score::new(Source::Reranking, 0.2);
        assert!(matches!(
            a.merge(b),
            Err(InternalFault::AmbiguousMerge { source_name: "RERANKING" })
        ));

        let r1 = Rank::new(Source::Vector, 1).unwrap();
        let r2 = Rank::new(Source::Vector, 2).unwrap();
        assert!(r1.merge(r2).is_err());
    }

    #[test]
    fn different_sources_do_not_mix() {
        let a = Score::new(Source::Vector, 0.1);
        let b = Score::empty(Source::Reranking);
        assert!(matches!(a.merge(b), Err(InternalFault::SourceMismatch { .. })));
        assert!(a.try_cmp(&b).is_err());

        let r1 = Rank::new(Source::Vector, 1).unwrap();
        let r2 = Rank::new(Source::Lexical, 1).unwrap();
        assert!(r1.try_cmp(&r2).is_err());
    }

    #[test]
    fn score_is_descending_rank_is_ascending() {
        let high = Score::new(Source::Vector, 0.9);
        let low = Score::new(Source::Vector, 0.1);
        assert_eq!(high.try_cmp(&low).unwrap(), Ordering::Less);

        let first = Rank::new(Source::Lexical, 1).unwrap();
        let third = Rank::new(Source::Lexical, 3).unwrap();
        assert_eq!(first.try_cmp(&third).unwrap(), Ordering::Less);
    }

    #[test]
    fn missing_values_sort_last() {
        let some = Score::new(Source::Reranking, -5.0);
        let none = Score::empty(Source::Reranking);
        assert_eq!(some.try_cmp(&none).unwrap(), Ordering::Less);
    }

    #[test]
    fn rank_must_be_positive() {
        assert!(matches!(
            Rank::new(Source::Vector, 0),
            Err(InternalFault::InvalidRank(0))
        ));
    }

    #[test]
    fn document_scores_merge_across_streams() {
        let vector = DocumentScores::from_vector(Some(0.7), 2).unwrap();
        let lexical = DocumentScores::from_lexical(1).unwrap();
        let merged = vector.merge(lexical).unwrap();

        assert_eq!(merged.vector().value(), Some(0.7));
        assert_eq!(merged.vector_rank().value(), Some(2));
        assert_eq!(merged.lexical_rank().value(), Some(1));
        assert!(!merged.rerank().exists());

        let again = merged.merge(DocumentScores::from_lexical(4).unwrap());
        assert!(again.is_err());
    }

    #[test]
    fn scores_json_only_includes_existing_signals() {
        let s = DocumentScores::from_lexical(3)
            .unwrap()
            .merge(DocumentScores::from_rerank(0.25))
            .unwrap();
        assert_eq!(
            s.to_json(),
            serde_json::json!({"$rerank": 0.25, "$lexicalRank": 3})
        );
    }
}
