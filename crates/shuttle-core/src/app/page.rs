//! Page - 応答の組み立て
//!
//! [`PageKind`] is the only command-specific step of response assembly: it
//! turns the payloads of completed tasks into response fields. Errors and
//! warnings are collected generically by the accumulator.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::domain::{InternalFault, TaskFailure, TaskPayload, TaskStatus, Warning};
use crate::task::Executable;

/// One entry of the response's error list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    /// Input position, for per-item response modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub error_code: String,
    pub message: String,
}

impl ResponseError {
    pub fn new(position: Option<usize>, failure: &TaskFailure) -> Self {
        Self {
            position,
            error_code: failure.code().to_string(),
            message: failure.message.clone(),
        }
    }
}

/// Assembled response for one command.
///
/// `status` is a `serde_json::Map` (sorted keys), so serializing the same
/// page twice gives the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub status: Map<String, Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// How a finished group is rendered, one variant per command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// `insertedIds`, or with `per_document` one `documentResponses` entry
    /// per input position.
    InsertMany { per_document: bool },
    InsertOne,
    Update,
    Delete,
    Read,
    Schema,
    Rerank { include_scores: bool },
}

impl PageKind {
    pub fn name(&self) -> &'static str {
        match self {
            PageKind::InsertMany { .. } => "insert_many",
            PageKind::InsertOne => "insert_one",
            PageKind::Update => "update",
            PageKind::Delete => "delete",
            PageKind::Read => "read",
            PageKind::Schema => "schema",
            PageKind::Rerank { .. } => "rerank",
        }
    }

    /// Whether errors carry the position of the failed item.
    pub fn tags_errors(&self) -> bool {
        matches!(self, PageKind::InsertMany { .. })
    }

    /// Renders payload fields into `page`. `tasks` are sorted by position and
    /// `page.errors` is already filled.
    pub(crate) fn render<T: Executable>(
        &self,
        tasks: &[T],
        page: &mut Page,
    ) -> Result<(), InternalFault> {
        match self {
            PageKind::InsertMany { per_document: true } => {
                let mut error_index = 0usize;
                let mut responses = Vec::with_capacity(tasks.len());
                for task in tasks {
                    let lifecycle = task.lifecycle();
                    let mut entry = Map::new();
                    if let Some(id) = task.document_id() {
                        entry.insert("_id".to_string(), id.into_value());
                    }
                    entry.insert("status".to_string(), json!(lifecycle.status().as_str()));
                    if lifecycle.status() == TaskStatus::Error && lifecycle.failure().is_some() {
                        entry.insert("errorsIdx".to_string(), json!(error_index));
                        error_index += 1;
                    }
                    // payload still has to be valid for completed tasks
                    self.inserted_id(task)?;
                    responses.push(Value::Object(entry));
                }
                page.status
                    .insert("documentResponses".to_string(), Value::Array(responses));
            }
            PageKind::InsertMany { per_document: false } | PageKind::InsertOne => {
                let mut ids = Vec::new();
                for task in tasks {
                    if let Some(id) = self.inserted_id(task)? {
                        ids.push(id);
                    }
                }
                page.status.insert("insertedIds".to_string(), Value::Array(ids));
            }
            PageKind::Update => {
                let (mut matched, mut modified) = (0u64, 0u64);
                let mut upserted = None;
                for task in tasks {
                    let Some(payload) = completed_payload(task)? else {
                        continue;
                    };
                    match payload {
                        TaskPayload::Modified {
                            matched: m,
                            modified: n,
                            upserted_id,
                        } => {
                            matched += m;
                            modified += n;
                            if upserted.is_none() {
                                upserted = upserted_id.clone();
                            }
                        }
                        other => return Err(self.mismatch(other, task)),
                    }
                }
                page.status.insert("matchedCount".to_string(), json!(matched));
                page.status.insert("modifiedCount".to_string(), json!(modified));
                if let Some(id) = upserted {
                    page.status.insert("upsertedId".to_string(), id.into_value());
                }
            }
            PageKind::Delete => {
                let mut deleted = 0u64;
                for task in tasks {
                    match completed_payload(task)? {
                        Some(TaskPayload::Deleted { count }) => deleted += count,
                        Some(other) => return Err(self.mismatch(other, task)),
                        None => {}
                    }
                }
                page.status.insert("deletedCount".to_string(), json!(deleted));
            }
            PageKind::Read => {
                let mut documents = Vec::new();
                let mut next_page_state = None;
                for task in tasks {
                    match completed_payload(task)? {
                        Some(TaskPayload::Read {
                            documents: rows,
                            paging_state,
                        }) => {
                            documents.extend(rows.iter().cloned());
                            next_page_state = paging_state.clone();
                        }
                        Some(other) => return Err(self.mismatch(other, task)),
                        None => {}
                    }
                }
                page.data = Some(json!({
                    "documents": documents,
                    "nextPageState": next_page_state,
                }));
            }
            PageKind::Schema => {
                let mut description = None;
                for task in tasks {
                    match completed_payload(task)? {
                        Some(TaskPayload::Schema { description: d }) => {
                            if description.is_none() {
                                description = d.clone();
                            }
                        }
                        Some(other) => return Err(self.mismatch(other, task)),
                        None => {}
                    }
                }
                if page.errors.is_empty() {
                    page.status.insert("ok".to_string(), json!(1));
                }
                if let Some(description) = description {
                    page.data = Some(description);
                }
            }
            PageKind::Rerank { include_scores } => {
                let mut documents = Vec::new();
                for task in tasks {
                    match completed_payload(task)? {
                        Some(TaskPayload::Reranked {
                            documents: ranked,
                            stats,
                        }) => {
                            documents.extend(ranked.iter().map(|d| d.render(*include_scores)));
                            page.status.insert(
                                "rerankStats".to_string(),
                                json!({
                                    "seen": stats.seen,
                                    "unique": stats.unique,
                                    "dropped": stats.dropped,
                                    "sent": stats.sent,
                                }),
                            );
                        }
                        Some(other) => return Err(self.mismatch(other, task)),
                        None => {}
                    }
                }
                page.data = Some(json!({ "documents": documents }));
            }
        }
        Ok(())
    }

    fn inserted_id<T: Executable>(&self, task: &T) -> Result<Option<Value>, InternalFault> {
        match completed_payload(task)? {
            Some(TaskPayload::Inserted { id }) => Ok(Some(id.as_value().clone())),
            Some(other) => Err(self.mismatch(other, task)),
            None => Ok(None),
        }
    }

    fn mismatch<T: Executable>(&self, payload: &TaskPayload, task: &T) -> InternalFault {
        InternalFault::PayloadMismatch {
            page: self.name(),
            payload: payload.name(),
            position: task.lifecycle().position(),
        }
    }
}

/// Payload of a completed task; `None` for every other terminal status.
fn completed_payload<T: Executable>(task: &T) -> Result<Option<&TaskPayload>, InternalFault> {
    if task.lifecycle().status() != TaskStatus::Completed {
        return Ok(None);
    }
    task.payload().map(Some).ok_or(InternalFault::MissingPayload {
        position: task.lifecycle().position(),
    })
}
