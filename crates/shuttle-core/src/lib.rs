//! shuttle-core
//!
//! Task execution core for document commands: per-item tasks with their own
//! lifecycle and retry policy, parallel or fail-fast sequential scheduling,
//! ordered response assembly, and fusion of ranked streams for reranking.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, errors, statements, scores, payloads）
//! - **ports**: 外部コラボレーター（StatementExecutor, ExceptionClassifier, RerankingProvider, Clock, IdGenerator）
//! - **retry**: RetryPolicy と decide()
//! - **task**: Task / TaskGroup / RerankingTask
//! - **app**: ExecutionContext, Operation, TaskAccumulator, Page
//! - **impls**: 開発用の実装（InMemoryStatementExecutor, TermOverlapReranker）
//! - **config**: ExecutionConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod retry;
pub mod task;

pub use app::{ExecutionContext, Operation, Page, PageKind, TaskAccumulator};
pub use config::ExecutionConfig;
pub use domain::{InternalFault, TaskFailure};
