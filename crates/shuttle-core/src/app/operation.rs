//! Operation - タスクグループの実行
//!
//! The one entry point a command layer needs: run a resolved group to
//! completion, then hand it to the accumulator and return the page.

use futures::future::join_all;
use tracing::info;

use super::accumulator::TaskAccumulator;
use super::context::ExecutionContext;
use super::page::Page;
use crate::domain::{InternalFault, TaskStatus};
use crate::task::{Executable, TaskGroup};

pub struct Operation<T> {
    group: TaskGroup<T>,
    accumulator: TaskAccumulator<T>,
}

impl<T: Executable> Operation<T> {
    pub fn new(group: TaskGroup<T>, accumulator: TaskAccumulator<T>) -> Self {
        Self { group, accumulator }
    }

    /// Runs every task to a terminal state and renders the page.
    ///
    /// Only internal faults are returned as `Err`; task failures end up in
    /// the page.
    pub async fn execute(self, ctx: &ExecutionContext) -> Result<Page, InternalFault> {
        let Self {
            mut group,
            mut accumulator,
        } = self;
        info!(
            group_id = %group.id(),
            tasks = group.len(),
            sequential = group.is_sequential(),
            page = accumulator.kind().name(),
            "executing task group"
        );

        if group.is_sequential() {
            run_sequential(&mut group, ctx).await?;
        } else {
            run_parallel(&mut group, ctx).await?;
        }

        group.assert_all_terminal()?;
        accumulator.accumulate(group)?;
        accumulator.into_page()
    }
}

/// All tasks in flight at once on the current task; none affects another.
async fn run_parallel<T: Executable>(
    group: &mut TaskGroup<T>,
    ctx: &ExecutionContext,
) -> Result<(), InternalFault> {
    join_all(group.tasks_mut().iter_mut().map(|task| task.execute(ctx)))
        .await
        .into_iter()
        .collect()
}

/// One task at a time in position order. Once a task is in `Error`, every
/// later task that is still `Ready` is skipped without being executed.
async fn run_sequential<T: Executable>(
    group: &mut TaskGroup<T>,
    ctx: &ExecutionContext,
) -> Result<(), InternalFault> {
    for index in 0..group.len() {
        let lifecycle = group.tasks()[index].lifecycle();
        let (position, status) = (lifecycle.position(), lifecycle.status());
        if status == TaskStatus::Ready && group.should_fail_fast_before(position) {
            let lifecycle = group.tasks_mut()[index].lifecycle_mut();
            info!(
                task_id = %lifecycle.id(),
                position = lifecycle.position(),
                "skipping task after earlier failure"
            );
            lifecycle.skip()?;
            continue;
        }
        group.tasks_mut()[index].execute(ctx).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::app::PageKind;
    use crate::domain::{ResultSet, Statement};
    use crate::impls::{InMemoryStatementExecutor, TermOverlapReranker};
    use crate::ports::{
        ProviderError, RankedPassage, RawFailure, RerankCredentials, RerankingProvider,
    };
    use crate::retry::{AllowFilteringRetryPolicy, NoRetryPolicy};
    use crate::task::{
        InsertDocument, RankedStream, ReadPage, RerankingTask, SchemaChange, StreamSource, Task,
        TaskBuilder,
    };

    fn insert_statement(position: usize) -> Statement {
        Statement::new(format!("INSERT INTO ks.docs JSON ? IF NOT EXISTS -- item {position}"))
    }

    fn insert_group(
        documents: Vec<Value>,
        sequential: bool,
    ) -> TaskGroup<Task<InsertDocument>> {
        let mut builder = TaskBuilder::default();
        let tasks = documents
            .into_iter()
            .enumerate()
            .map(|(position, document)| {
                builder
                    .task(
                        InsertDocument::new(document, insert_statement(position)),
                        Arc::new(NoRetryPolicy),
                    )
                    .unwrap()
            })
            .collect();
        builder.group(tasks, sequential).unwrap()
    }

    async fn run_insert(
        executor: Arc<InMemoryStatementExecutor>,
        documents: Vec<Value>,
        sequential: bool,
    ) -> Page {
        let group = insert_group(documents, sequential);
        let accumulator = TaskAccumulator::new(PageKind::InsertMany { per_document: true });
        Operation::new(group, accumulator)
            .execute(&ExecutionContext::new(executor))
            .await
            .unwrap()
    }

    fn statuses(page: &Page) -> Vec<String> {
        page.status["documentResponses"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["status"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn ordered_insert_skips_after_invalid_document() {
        let executor = Arc::new(
            InMemoryStatementExecutor::new().with_default(Ok(ResultSet::applied(true))),
        );
        let documents = vec![json!({"_id": 0}), json!({"name": "no id"}), json!({"_id": 2})];

        let page = run_insert(executor.clone(), documents, true).await;

        assert_eq!(statuses(&page), vec!["OK", "ERROR", "SKIPPED"]);
        assert_eq!(executor.call_count().await, 1);
        assert_eq!(page.errors.len(), 1);
        assert_eq!(page.errors[0].position, Some(1));
        assert_eq!(page.errors[0].error_code, "INVALID_INPUT");
    }

    #[tokio::test]
    async fn sequential_failure_skips_the_rest_without_executing_them() {
        let executor = Arc::new(
            InMemoryStatementExecutor::new()
                .with_default(Ok(ResultSet::applied(true)))
                .always("item 2", Err(RawFailure::Syntax("bad".into()))),
        );
        let documents = (0..5).map(|i| json!({"_id": i})).collect();

        let page = run_insert(executor.clone(), documents, true).await;

        assert_eq!(statuses(&page), vec!["OK", "OK", "ERROR", "SKIPPED", "SKIPPED"]);
        let calls = executor.calls().await;
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|s| !s.query().contains("item 3") && !s.query().contains("item 4")));
    }

    async fn run_schema_changes(queries: &[&str]) -> (Vec<TaskStatus>, usize) {
        let executor = Arc::new(InMemoryStatementExecutor::new());
        let mut builder = TaskBuilder::default();
        let tasks = queries
            .iter()
            .map(|query| {
                builder
                    .task(SchemaChange::new(Statement::new(*query)), Arc::new(NoRetryPolicy))
                    .unwrap()
            })
            .collect();
        let mut group = builder.group(tasks, true).unwrap();

        run_sequential(&mut group, &ExecutionContext::new(executor.clone()))
            .await
            .unwrap();

        let statuses = group.tasks().iter().map(|t| t.lifecycle().status()).collect();
        (statuses, executor.call_count().await)
    }

    #[tokio::test]
    async fn invalid_last_task_does_not_skip_earlier_ones() {
        let (statuses, calls) = run_schema_changes(&[
            "CREATE TABLE ks.a (k int PRIMARY KEY)",
            "CREATE TABLE ks.b (k int PRIMARY KEY)",
            "  ",
        ])
        .await;

        assert_eq!(
            statuses,
            vec![TaskStatus::Completed, TaskStatus::Completed, TaskStatus::Error]
        );
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn invalid_middle_task_skips_only_later_ones() {
        let (statuses, calls) = run_schema_changes(&[
            "CREATE TABLE ks.a (k int PRIMARY KEY)",
            "  ",
            "CREATE TABLE ks.c (k int PRIMARY KEY)",
        ])
        .await;

        assert_eq!(
            statuses,
            vec![TaskStatus::Completed, TaskStatus::Error, TaskStatus::Skipped]
        );
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn parallel_failure_does_not_affect_siblings() {
        let executor = Arc::new(
            InMemoryStatementExecutor::new()
                .with_default(Ok(ResultSet::applied(true)))
                .always("item 2", Err(RawFailure::WriteTimeout("slow".into()))),
        );
        let documents = (0..5).map(|i| json!({"_id": i})).collect();

        let page = run_insert(executor.clone(), documents, false).await;

        assert_eq!(statuses(&page), vec!["OK", "OK", "ERROR", "OK", "OK"]);
        assert_eq!(executor.call_count().await, 5);
        assert_eq!(page.errors[0].error_code, "DATABASE_TIMEOUT");
    }

    #[tokio::test]
    async fn duplicate_document_is_reported_per_item() {
        let executor = Arc::new(
            InMemoryStatementExecutor::new()
                .with_default(Ok(ResultSet::applied(true)))
                .always("item 1", Ok(ResultSet::applied(false))),
        );
        let documents = vec![json!({"_id": "a"}), json!({"_id": "b"})];

        let page = run_insert(executor, documents, false).await;

        assert_eq!(
            page.status["documentResponses"],
            json!([
                {"_id": "a", "status": "OK"},
                {"_id": "b", "status": "ERROR", "errorsIdx": 0},
            ])
        );
        assert_eq!(page.errors[0].error_code, "DOCUMENT_ALREADY_EXISTS");
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_tasks_are_in_flight_together() {
        let executor = Arc::new(
            InMemoryStatementExecutor::new()
                .with_default(Ok(ResultSet::applied(true)))
                .with_latency(Duration::from_millis(100)),
        );
        let documents = (0..4).map(|i| json!({"_id": i})).collect();

        let started = tokio::time::Instant::now();
        run_insert(executor, documents, false).await;

        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn repeated_runs_render_identical_bytes() {
        let render = || async {
            let executor = Arc::new(
                InMemoryStatementExecutor::new()
                    .with_default(Ok(ResultSet::applied(true)))
                    .always("item 1", Err(RawFailure::Unavailable("down".into()))),
            );
            let documents = (0..3).map(|i| json!({"_id": i})).collect();
            let page = run_insert(executor, documents, false).await;
            serde_json::to_string(&page).unwrap()
        };
        assert_eq!(render().await, render().await);
    }

    #[tokio::test]
    async fn paged_read_with_scan_flag_retry() {
        let mut page_one = ResultSet::with_rows(vec![json!({"_id": 1}), json!({"_id": 2})]);
        page_one.paging_state = Some("token-1".into());
        let executor = Arc::new(
            InMemoryStatementExecutor::new()
                .once(
                    "color",
                    Err(RawFailure::InvalidQuery("use ALLOW FILTERING".into())),
                )
                .once("color", Ok(page_one)),
        );
        let mut builder = TaskBuilder::default();
        let task = builder
            .task(
                ReadPage::new(Statement::new("SELECT * FROM ks.docs WHERE color = ?")),
                Arc::new(AllowFilteringRetryPolicy::default()),
            )
            .unwrap();
        let group = builder.group(vec![task], false).unwrap();

        let page = Operation::new(group, TaskAccumulator::new(PageKind::Read))
            .execute(&ExecutionContext::new(executor))
            .await
            .unwrap();

        assert_eq!(
            page.data,
            Some(json!({
                "documents": [{"_id": 1}, {"_id": 2}],
                "nextPageState": "token-1",
            }))
        );
        assert!(page.errors.is_empty());
        assert_eq!(page.warnings.len(), 1);
    }

    /// Counts calls and answers with fewer ranks than passages.
    #[derive(Default)]
    struct ShortProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RerankingProvider for ShortProvider {
        fn name(&self) -> &str {
            "short"
        }

        async fn rerank(
            &self,
            _query: &str,
            _passages: &[String],
            _credentials: &RerankCredentials,
        ) -> Result<Vec<RankedPassage>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RankedPassage::new(0, 1.0)])
        }
    }

    async fn run_rerank(
        provider: Arc<dyn RerankingProvider>,
        streams: Vec<RankedStream>,
        include_scores: bool,
    ) -> Result<Page, InternalFault> {
        let mut builder = TaskBuilder::default();
        let (id, position) = builder.next_slot();
        let task = RerankingTask::new(id, position, "capital of France", streams, provider)
            .with_limit(2)
            .prepared()?;
        let group = builder.group(vec![task], false)?;
        let ctx = ExecutionContext::new(Arc::new(InMemoryStatementExecutor::new()));
        Operation::new(group, TaskAccumulator::new(PageKind::Rerank { include_scores }))
            .execute(&ctx)
            .await
    }

    #[tokio::test]
    async fn rerank_end_to_end() {
        let streams = vec![
            RankedStream::vector(vec![
                json!({"_id": "berlin", "$similarity": 0.91, "$vectorize": "Berlin is in Germany"}),
                json!({"_id": "paris", "$similarity": 0.88, "$vectorize": "Paris is the capital of France"}),
            ]),
            RankedStream::lexical(vec![
                json!({"_id": "paris", "$vectorize": "Paris is the capital of France"}),
                json!({"_id": "lyon", "$vectorize": "Lyon is a city in France"}),
                json!({"_id": "untitled"}),
            ]),
        ];

        let page = run_rerank(Arc::new(TermOverlapReranker::new()), streams, true)
            .await
            .unwrap();

        let documents = page.data.as_ref().unwrap()["documents"].as_array().unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["paris", "lyon"]);
        assert_eq!(documents[0]["$scores"]["$vectorRank"], json!(2));
        assert_eq!(documents[0]["$scores"]["$lexicalRank"], json!(1));
        assert_eq!(
            page.status["rerankStats"],
            json!({"seen": 5, "unique": 4, "dropped": 1, "sent": 3})
        );
        assert_eq!(page.warnings.len(), 1);
    }

    #[tokio::test]
    async fn finished_reads_feed_the_reranking_task() {
        let executor = Arc::new(
            InMemoryStatementExecutor::new()
                .always(
                    "ORDER BY vector",
                    Ok(ResultSet::with_rows(vec![
                        json!({"_id": "berlin", "$vectorize": "Berlin is in Germany"}),
                        json!({"_id": "paris", "$vectorize": "Paris is the capital of France"}),
                    ])),
                )
                .always(
                    "lexical MATCH",
                    Ok(ResultSet::with_rows(vec![
                        json!({"_id": "paris", "$vectorize": "Paris is the capital of France"}),
                    ])),
                ),
        );
        let ctx = ExecutionContext::new(executor);
        let mut builder = TaskBuilder::default();
        let reads = vec![
            builder
                .task(
                    ReadPage::new(Statement::new("SELECT * FROM ks.docs ORDER BY vector ANN OF ?")),
                    Arc::new(NoRetryPolicy),
                )
                .unwrap(),
            builder
                .task(
                    ReadPage::new(Statement::new("SELECT * FROM ks.docs WHERE lexical MATCH ?")),
                    Arc::new(NoRetryPolicy),
                )
                .unwrap(),
        ];
        let mut reads = builder.group(reads, false).unwrap();
        run_parallel(&mut reads, &ctx).await.unwrap();

        let sources = [StreamSource::Vector, StreamSource::Lexical];
        let streams = reads
            .tasks()
            .iter()
            .zip(sources)
            .map(|(task, source)| {
                RankedStream::from_payload(source, task.payload().unwrap()).unwrap()
            })
            .collect();

        let mut builder = TaskBuilder::default();
        let (id, position) = builder.next_slot();
        let provider = Arc::new(TermOverlapReranker::new());
        let rerank = RerankingTask::new(id, position, "capital of France", streams, provider)
            .prepared()
            .unwrap();
        let page = Operation::new(
            builder.group(vec![rerank], false).unwrap(),
            TaskAccumulator::new(PageKind::Rerank { include_scores: false }),
        )
        .execute(&ctx)
        .await
        .unwrap();

        let documents = page.data.as_ref().unwrap()["documents"].as_array().unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["paris", "berlin"]);
        assert_eq!(
            page.status["rerankStats"],
            json!({"seen": 3, "unique": 2, "dropped": 0, "sent": 2})
        );
    }

    #[tokio::test]
    async fn rerank_without_passages_never_calls_the_provider() {
        let provider = Arc::new(ShortProvider::default());
        let streams = vec![RankedStream::lexical(vec![json!({"_id": 1, "$vectorize": ""})])];

        let page = run_rerank(provider.clone(), streams, false).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(page.data, Some(json!({"documents": []})));
        assert!(page.errors.is_empty());
    }

    #[tokio::test]
    async fn rerank_contract_violation_aborts_the_request() {
        let provider = Arc::new(ShortProvider::default());
        let streams = vec![RankedStream::vector(vec![
            json!({"_id": 1, "$vectorize": "one"}),
            json!({"_id": 2, "$vectorize": "two"}),
        ])];

        let fault = run_rerank(provider.clone(), streams, false).await.unwrap_err();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            fault,
            InternalFault::RankCountMismatch {
                passages: 2,
                ranks: 1
            }
        );
    }
}
