//! Domain model (ids, status, failures, statements, scores, payloads).

pub mod attempt;
pub mod document;
pub mod errors;
pub mod ids;
pub mod payload;
pub mod score;
pub mod scored_document;
pub mod statement;
pub mod status;
pub mod warning;

pub use attempt::AttemptRecord;
pub use document::{DocumentId, NodeKind};
pub use errors::{FailureKind, InternalFault, TaskFailure};
pub use ids::{GroupId, TaskId};
pub use payload::{RerankStats, TaskPayload};
pub use score::{DocumentScores, Rank, Score, Source};
pub use scored_document::ScoredDocument;
pub use statement::{ResultSet, Statement};
pub use status::TaskStatus;
pub use warning::{Warning, WarningCode};
