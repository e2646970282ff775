use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shuttle_core::domain::{ResultSet, Statement};
use shuttle_core::impls::{InMemoryStatementExecutor, TermOverlapReranker};
use shuttle_core::ports::RawFailure;
use shuttle_core::task::{InsertDocument, RankedStream, RerankingTask, TaskBuilder};
use shuttle_core::{ExecutionConfig, ExecutionContext, Operation, Page, PageKind, TaskAccumulator};

#[derive(Parser)]
#[command(name = "shuttle", version, about = "Run document commands against an in-memory executor")]
struct Cli {
    /// ExecutionConfig as a JSON file; missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert a JSON array of documents, one task per document
    Insert {
        /// e.g. '[{"_id": 1}, {"_id": 2}]'
        #[arg(long)]
        documents: String,

        /// Sequential with fail-fast instead of parallel
        #[arg(long)]
        ordered: bool,

        /// Render documentResponses instead of insertedIds
        #[arg(long)]
        per_document: bool,

        /// Simulate a write timeout for the document at this position
        #[arg(long)]
        fail_position: Option<usize>,

        /// Simulate an existing _id for the document at this position
        #[arg(long)]
        conflict_position: Option<usize>,
    },

    /// Fuse vector and lexical results, then rerank them locally
    Rerank {
        #[arg(long)]
        query: String,

        /// JSON array of documents in vector rank order
        #[arg(long, default_value = "[]")]
        vector: String,

        /// JSON array of documents in lexical rank order
        #[arg(long, default_value = "[]")]
        lexical: String,

        #[arg(long)]
        limit: Option<usize>,

        /// Render $scores even when the config leaves them off
        #[arg(long)]
        include_scores: bool,
    },
}

fn parse_documents(name: &str, raw: &str) -> anyhow::Result<Vec<Value>> {
    serde_json::from_str(raw).with_context(|| format!("--{name} must be a JSON array of documents"))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ExecutionConfig> {
    let Some(path) = path else {
        return Ok(ExecutionConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn insert_statement(position: usize, document: &Value) -> Statement {
    Statement::new(format!(
        "INSERT INTO demo.docs JSON ? IF NOT EXISTS /* item {position} */"
    ))
    .with_values(vec![document.clone()])
}

async fn run_insert(
    config: &ExecutionConfig,
    documents: Vec<Value>,
    ordered: bool,
    per_document: bool,
    fail_position: Option<usize>,
    conflict_position: Option<usize>,
) -> anyhow::Result<Page> {
    let mut executor = InMemoryStatementExecutor::new().with_default(Ok(ResultSet::applied(true)));
    if let Some(position) = fail_position {
        executor = executor.always(
            format!("/* item {position} */"),
            Err(RawFailure::WriteTimeout("simulated write timeout".to_string())),
        );
    }
    if let Some(position) = conflict_position {
        executor = executor.always(format!("/* item {position} */"), Ok(ResultSet::applied(false)));
    }

    let mut builder = TaskBuilder::default();
    let mut tasks = Vec::with_capacity(documents.len());
    for (position, document) in documents.into_iter().enumerate() {
        let statement = insert_statement(position, &document);
        tasks.push(builder.task(InsertDocument::new(document, statement), config.no_retry())?);
    }
    let group = builder.group(tasks, ordered)?;
    info!(tasks = group.len(), ordered, "running insert");

    let ctx = ExecutionContext::new(Arc::new(executor));
    let page = Operation::new(group, TaskAccumulator::new(PageKind::InsertMany { per_document }))
        .execute(&ctx)
        .await?;
    Ok(page)
}

async fn run_rerank(
    config: &ExecutionConfig,
    query: String,
    vector: Vec<Value>,
    lexical: Vec<Value>,
    limit: Option<usize>,
    include_scores: bool,
) -> anyhow::Result<Page> {
    let mut builder = TaskBuilder::default();
    let (id, position) = builder.next_slot();
    let streams = vec![RankedStream::vector(vector), RankedStream::lexical(lexical)];
    let mut task = RerankingTask::new(id, position, query, streams, Arc::new(TermOverlapReranker::new()))
        .with_extractor(config.passage_extractor());
    if let Some(limit) = limit {
        task = task.with_limit(limit);
    }
    let group = builder.group(vec![task.prepared()?], false)?;

    let ctx = ExecutionContext::new(Arc::new(InMemoryStatementExecutor::new()));
    let page = Operation::new(group, TaskAccumulator::new(PageKind::Rerank { include_scores }))
        .execute(&ctx)
        .await?;
    Ok(page)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let page = match cli.cmd {
        Command::Insert {
            documents,
            ordered,
            per_document,
            fail_position,
            conflict_position,
        } => {
            let documents = parse_documents("documents", &documents)?;
            run_insert(&config, documents, ordered, per_document, fail_position, conflict_position)
                .await?
        }
        Command::Rerank {
            query,
            vector,
            lexical,
            limit,
            include_scores,
        } => {
            let vector = parse_documents("vector", &vector)?;
            let lexical = parse_documents("lexical", &lexical)?;
            let include_scores = include_scores || config.include_scores;
            run_rerank(&config, query, vector, lexical, limit, include_scores).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
