//! Statements and result sets exchanged with the statement executor.
//!
//! The core does not know the wire format. A [`Statement`] is whatever the
//! command's query builder produced; the only part the core looks at is the
//! opt-in scan flag, because the read retry policy rewrites it.

use serde::{Deserialize, Serialize};

const ALLOW_FILTERING: &str = "ALLOW FILTERING";

/// An opaque, already-built unit of database work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<serde_json::Value>,
}

impl Statement {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.values = values;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn values(&self) -> &[serde_json::Value] {
        &self.values
    }

    /// Whether the statement already carries the opt-in scan flag.
    pub fn allows_filtering(&self) -> bool {
        self.query
            .trim_end()
            .trim_end_matches(';')
            .trim_end()
            .to_ascii_uppercase()
            .ends_with(ALLOW_FILTERING)
    }

    /// Copy of this statement with the opt-in scan flag appended.
    ///
    /// Returns `None` if the flag is already present.
    pub fn with_allow_filtering(&self) -> Option<Statement> {
        if self.allows_filtering() {
            return None;
        }
        let base = self.query.trim_end().trim_end_matches(';').trim_end();
        Some(Statement {
            query: format!("{base} {ALLOW_FILTERING}"),
            values: self.values.clone(),
        })
    }
}

/// Rows (and metadata) returned by a successful execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,

    /// Paging state for the next page, if the read was not exhausted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging_state: Option<String>,

    /// `[applied]` column of a conditional write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<bool>,

    /// Server-side warnings attached to the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<serde_json::Value>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn applied(applied: bool) -> Self {
        Self {
            applied: Some(applied),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("SELECT * FROM ks.t WHERE a = ?", false)]
    #[case::flagged("SELECT * FROM ks.t WHERE a = ? ALLOW FILTERING", true)]
    #[case::lowercase("select * from ks.t where a = ? allow filtering;", true)]
    fn detects_scan_flag(#[case] query: &str, #[case] expected: bool) {
        assert_eq!(Statement::new(query).allows_filtering(), expected);
    }

    #[test]
    fn appends_flag_once() {
        let s = Statement::new("SELECT * FROM ks.t WHERE a = ?;")
            .with_values(vec![serde_json::json!(1)]);
        let flagged = s.with_allow_filtering().unwrap();
        assert_eq!(flagged.query(), "SELECT * FROM ks.t WHERE a = ? ALLOW FILTERING");
        assert_eq!(flagged.values(), s.values());
        assert!(flagged.with_allow_filtering().is_none());
    }
}
