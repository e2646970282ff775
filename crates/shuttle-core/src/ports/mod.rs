//! Ports - 外部コラボレーターへのインターフェース
//!
//! The core consumes three capabilities (statement executor, exception
//! classifier, reranking provider) and never depends on their implementation.

pub mod classifier;
pub mod clock;
pub mod executor;
pub mod id_generator;
pub mod reranker;

pub use self::classifier::{DefaultExceptionClassifier, ExceptionClassifier};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::{RawFailure, StatementExecutor};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::reranker::{ProviderError, RankedPassage, RerankCredentials, RerankingProvider};
