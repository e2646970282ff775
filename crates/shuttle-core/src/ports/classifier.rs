//! ExceptionClassifier port - raw driver failure -> domain failure.
//!
//! Retry predicates and page rendering only ever see [`TaskFailure`]s.

use crate::domain::{FailureKind, TaskFailure};
use crate::ports::executor::RawFailure;

pub trait ExceptionClassifier: Send + Sync {
    fn classify(&self, raw: RawFailure) -> TaskFailure;
}

/// Classifier for CQL driver failures.
///
/// `InvalidQuery` is split by message: the database rejects filtering on
/// non-indexed columns with a message that names ALLOW FILTERING.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExceptionClassifier;

impl ExceptionClassifier for DefaultExceptionClassifier {
    fn classify(&self, raw: RawFailure) -> TaskFailure {
        match raw {
            RawFailure::ReadTimeout(msg) | RawFailure::WriteTimeout(msg) => {
                TaskFailure::new(FailureKind::Timeout, msg)
            }
            RawFailure::Unavailable(msg) => TaskFailure::new(FailureKind::Unavailable, msg),
            RawFailure::InvalidQuery(msg) if msg.to_ascii_uppercase().contains("ALLOW FILTERING") => {
                TaskFailure::new(FailureKind::MissingScanFlag, msg)
            }
            RawFailure::InvalidQuery(msg) | RawFailure::Syntax(msg) => {
                TaskFailure::new(FailureKind::InvalidQuery, msg)
            }
            // Overloaded is an execution failure too, but outside the narrow
            // retryable set.
            RawFailure::Overloaded(msg) | RawFailure::Other(msg) => {
                TaskFailure::new(FailureKind::Unexpected, msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::read_timeout(RawFailure::ReadTimeout("t".into()), FailureKind::Timeout)]
    #[case::write_timeout(RawFailure::WriteTimeout("t".into()), FailureKind::Timeout)]
    #[case::unavailable(RawFailure::Unavailable("u".into()), FailureKind::Unavailable)]
    #[case::scan_flag(
        RawFailure::InvalidQuery(
            "Cannot execute this query as it might involve data filtering; use ALLOW FILTERING".into()
        ),
        FailureKind::MissingScanFlag
    )]
    #[case::invalid(RawFailure::InvalidQuery("Undefined column name x".into()), FailureKind::InvalidQuery)]
    #[case::syntax(RawFailure::Syntax("line 1:0".into()), FailureKind::InvalidQuery)]
    #[case::overloaded(RawFailure::Overloaded("o".into()), FailureKind::Unexpected)]
    fn classifies(#[case] raw: RawFailure, #[case] expected: FailureKind) {
        assert_eq!(DefaultExceptionClassifier.classify(raw).kind, expected);
    }

    #[test]
    fn keeps_the_driver_message() {
        let failure = DefaultExceptionClassifier.classify(RawFailure::Unavailable("2 replicas".into()));
        assert_eq!(failure.message, "2 replicas");
    }
}
