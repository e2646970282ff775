//! Command behaviours for the common document operations.
//!
//! Statements arrive already built by the query builder; these types only
//! decide what counts as valid input and how rows map to a payload.

use serde_json::Value;

use super::Command;
use crate::domain::{
    DocumentId, FailureKind, ResultSet, Statement, TaskFailure, TaskPayload,
};

/// Writes one document (conditional insert).
#[derive(Debug, Clone)]
pub struct InsertDocument {
    document: Value,
    statement: Statement,
}

impl InsertDocument {
    pub fn new(document: Value, statement: Statement) -> Self {
        Self {
            document,
            statement,
        }
    }
}

impl Command for InsertDocument {
    fn name(&self) -> &'static str {
        "insert_document"
    }

    fn build(&self) -> Result<Statement, TaskFailure> {
        let Value::Object(fields) = &self.document else {
            return Err(TaskFailure::invalid_input("document must be a JSON object"));
        };
        match fields.get(DocumentId::FIELD) {
            None => Err(TaskFailure::invalid_input("document is missing `_id`")),
            Some(Value::Null) => Err(TaskFailure::invalid_input("`_id` must not be null")),
            Some(Value::Array(_)) | Some(Value::Object(_)) => Err(TaskFailure::invalid_input(
                "`_id` must be a string, number or boolean",
            )),
            Some(_) => Ok(self.statement.clone()),
        }
    }

    fn decode(&self, result: ResultSet) -> Result<TaskPayload, TaskFailure> {
        let id = self
            .document_id()
            .ok_or_else(|| TaskFailure::invalid_input("document is missing `_id`"))?;
        if result.applied == Some(false) {
            return Err(TaskFailure::new(
                FailureKind::DocumentConflict,
                format!("a document with _id {id} already exists"),
            ));
        }
        Ok(TaskPayload::Inserted { id })
    }

    fn document_id(&self) -> Option<DocumentId> {
        DocumentId::from_document(&self.document)
    }
}

/// Reads one page.
#[derive(Debug, Clone)]
pub struct ReadPage {
    statement: Statement,
}

impl ReadPage {
    pub fn new(statement: Statement) -> Self {
        Self { statement }
    }
}

impl Command for ReadPage {
    fn name(&self) -> &'static str {
        "read_page"
    }

    fn build(&self) -> Result<Statement, TaskFailure> {
        Ok(self.statement.clone())
    }

    fn decode(&self, result: ResultSet) -> Result<TaskPayload, TaskFailure> {
        Ok(TaskPayload::Read {
            documents: result.rows,
            paging_state: result.paging_state,
        })
    }
}

/// Applies an update to one document (optionally upserting).
#[derive(Debug, Clone)]
pub struct UpdateDocument {
    statement: Statement,
    upsert_id: Option<DocumentId>,
}

impl UpdateDocument {
    pub fn new(statement: Statement) -> Self {
        Self {
            statement,
            upsert_id: None,
        }
    }

    pub fn upsert(statement: Statement, id: DocumentId) -> Self {
        Self {
            statement,
            upsert_id: Some(id),
        }
    }
}

impl Command for UpdateDocument {
    fn name(&self) -> &'static str {
        "update_document"
    }

    fn build(&self) -> Result<Statement, TaskFailure> {
        Ok(self.statement.clone())
    }

    /// `[applied] = false` means the condition matched nothing. With an
    /// upsert id, an unmatched update that still wrote counts as upserted.
    fn decode(&self, result: ResultSet) -> Result<TaskPayload, TaskFailure> {
        let payload = match (result.applied, &self.upsert_id) {
            (Some(false), _) => TaskPayload::Modified {
                matched: 0,
                modified: 0,
                upserted_id: None,
            },
            (None, Some(id)) => TaskPayload::Modified {
                matched: 0,
                modified: 0,
                upserted_id: Some(id.clone()),
            },
            _ => TaskPayload::Modified {
                matched: 1,
                modified: 1,
                upserted_id: None,
            },
        };
        Ok(payload)
    }

    fn document_id(&self) -> Option<DocumentId> {
        self.upsert_id.clone()
    }
}

/// Deletes rows matched by one statement.
#[derive(Debug, Clone)]
pub struct DeleteDocuments {
    statement: Statement,
}

impl DeleteDocuments {
    pub fn new(statement: Statement) -> Self {
        Self { statement }
    }
}

impl Command for DeleteDocuments {
    fn name(&self) -> &'static str {
        "delete_documents"
    }

    fn build(&self) -> Result<Statement, TaskFailure> {
        Ok(self.statement.clone())
    }

    /// Returned rows are the deleted keys; a bare conditional delete reports
    /// through `[applied]`.
    fn decode(&self, result: ResultSet) -> Result<TaskPayload, TaskFailure> {
        let count = match result.applied {
            Some(false) => 0,
            Some(true) => 1,
            None => result.rows.len() as u64,
        };
        Ok(TaskPayload::Deleted { count })
    }
}

/// A DDL statement (create/drop table or index, alter table).
#[derive(Debug, Clone)]
pub struct SchemaChange {
    statement: Statement,
}

impl SchemaChange {
    pub fn new(statement: Statement) -> Self {
        Self { statement }
    }
}

impl Command for SchemaChange {
    fn name(&self) -> &'static str {
        "schema_change"
    }

    fn validate(&self) -> Result<(), TaskFailure> {
        if self.statement.query().trim().is_empty() {
            return Err(TaskFailure::invalid_input("schema statement is empty"));
        }
        Ok(())
    }

    fn build(&self) -> Result<Statement, TaskFailure> {
        Ok(self.statement.clone())
    }

    fn decode(&self, result: ResultSet) -> Result<TaskPayload, TaskFailure> {
        Ok(TaskPayload::Schema {
            description: result.rows.into_iter().next(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn insert(document: Value) -> InsertDocument {
        InsertDocument::new(document, Statement::new("INSERT INTO ks.docs JSON ? IF NOT EXISTS"))
    }

    #[rstest]
    #[case::not_object(json!([1, 2]))]
    #[case::missing_id(json!({"name": "x"}))]
    #[case::null_id(json!({"_id": null}))]
    #[case::object_id(json!({"_id": {"a": 1}}))]
    fn insert_rejects_bad_documents(#[case] document: Value) {
        let err = insert(document).build().unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidInput);
    }

    #[test]
    fn insert_conflict_when_not_applied() {
        let err = insert(json!({"_id": 1}))
            .decode(ResultSet::applied(false))
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::DocumentConflict);
    }

    #[test]
    fn insert_returns_id() {
        let payload = insert(json!({"_id": "a"}))
            .decode(ResultSet::applied(true))
            .unwrap();
        assert!(matches!(payload, TaskPayload::Inserted { id } if id == DocumentId::from("a")));
    }

    #[test]
    fn read_passes_rows_and_paging_state() {
        let mut result = ResultSet::with_rows(vec![json!({"_id": 1})]);
        result.paging_state = Some("p1".into());
        match ReadPage::new(Statement::new("SELECT")).decode(result).unwrap() {
            TaskPayload::Read {
                documents,
                paging_state,
            } => {
                assert_eq!(documents.len(), 1);
                assert_eq!(paging_state.as_deref(), Some("p1"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[rstest]
    #[case::applied(Some(true), 1)]
    #[case::not_applied(Some(false), 0)]
    fn update_counts(#[case] applied: Option<bool>, #[case] expected: u64) {
        let result = ResultSet {
            applied,
            ..ResultSet::default()
        };
        match UpdateDocument::new(Statement::new("UPDATE")).decode(result).unwrap() {
            TaskPayload::Modified {
                matched, modified, ..
            } => {
                assert_eq!(matched, expected);
                assert_eq!(modified, expected);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn delete_counts_returned_rows() {
        let result = ResultSet::with_rows(vec![json!({"_id": 1}), json!({"_id": 2})]);
        let payload = DeleteDocuments::new(Statement::new("DELETE")).decode(result).unwrap();
        assert!(matches!(payload, TaskPayload::Deleted { count: 2 }));
    }

    #[test]
    fn schema_change_rejects_empty_statement() {
        assert!(SchemaChange::new(Statement::new("  ")).validate().is_err());
    }
}
