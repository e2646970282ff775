//! App - アプリケーション層
//!
//! Runs a resolved task group and turns it into a response.
//!
//! # 主要コンポーネント
//! - **ExecutionContext**: executor and classifier shared by the request
//! - **Operation**: parallel or sequential (fail-fast) scheduling
//! - **TaskAccumulator**: ordered collection of finished tasks
//! - **Page / PageKind**: response assembly per command kind

pub mod accumulator;
pub mod context;
pub mod operation;
pub mod page;

pub use self::accumulator::TaskAccumulator;
pub use self::context::ExecutionContext;
pub use self::operation::Operation;
pub use self::page::{Page, PageKind, ResponseError};
