//! Impls - 実装（開発用・テスト用）
//!
//! Local implementations of the ports:
//! - **InMemoryStatementExecutor**: scripted statement executor
//! - **TermOverlapReranker**: offline reranking provider
//!
//! Production drivers (CQL session, HTTP reranking client) live outside this
//! crate and plug in through the same traits.

pub mod memory_executor;
pub mod term_overlap;

pub use self::memory_executor::InMemoryStatementExecutor;
pub use self::term_overlap::TermOverlapReranker;
