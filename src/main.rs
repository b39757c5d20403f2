//! # Sidekick CLI (`sk`)
//!
//! The `sk` binary is the primary interface for Sidekick. It provides
//! commands for database initialization, document ingestion, similarity
//! search, dataset lifecycle, and running the full agent loop.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sk init` | Create the SQLite database and run schema migrations |
//! | `sk add <dataset> <file>` | Ingest a file into a dataset |
//! | `sk query <dataset> "<text>"` | Similarity search within a dataset |
//! | `sk datasets` | List datasets and document counts |
//! | `sk info <dataset>` | Show one dataset's documents and counts |
//! | `sk show <id>` | Print one document's content |
//! | `sk forget` | Delete a document or a whole dataset |
//! | `sk stats` | Database totals and per-dataset breakdown |
//! | `sk ask "<request>"` | Run the orchestrator loop on a request |

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use sidekick::config::{load_config, Config};
use sidekick::context::ContextAssembler;
use sidekick::executor::{ExecutionMode, StepExecutor, StepStatus};
use sidekick::intent::IntentDetector;
use sidekick::memory::SqliteMemory;
use sidekick::orchestrator::Orchestrator;
use sidekick::plan::PlanGenerator;
use sidekick::store::RetrievalStore;
use sidekick::tools::{KnowledgeTool, MemoryTool, ToolRegistry};
use sidekick::{db, embedding, migrate, reasoning, stats};

/// Sidekick CLI — a local-first personal agent runtime.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sidekick.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sk",
    about = "Sidekick — a local-first personal agent runtime",
    version,
    long_about = "Sidekick turns a free-text request into a plan of tool invocations, \
    gates plans that mutate state behind explicit confirmation, executes steps sequentially \
    with result chaining, and keeps long-term context in a SQLite retrieval store."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sidekick.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks, messages). Idempotent.
    Init,

    /// Ingest a file into a dataset.
    Add {
        /// Dataset to add the document to (e.g. "knowledge", "projects").
        dataset: String,
        /// Path of the file to ingest.
        file: PathBuf,
        /// Optional metadata as a JSON object string.
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Similarity search within a dataset.
    Query {
        dataset: String,
        text: String,
        /// Maximum number of results.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List datasets and their document counts.
    Datasets,

    /// Show one dataset's documents and counts.
    Info { dataset: String },

    /// Print one document's content by id.
    Show {
        /// Document id (see `sk info <dataset>`).
        id: String,
    },

    /// Delete a document by id, or a whole dataset.
    Forget {
        /// Document id to delete.
        #[arg(long, conflicts_with = "dataset")]
        document: Option<String>,
        /// Dataset name to delete entirely.
        #[arg(long)]
        dataset: Option<String>,
    },

    /// Database totals and per-dataset breakdown.
    Stats,

    /// Run the orchestrator loop on one request.
    Ask {
        /// The request text.
        text: String,
        /// Execution mode.
        #[arg(long, value_enum, default_value_t = CliMode::Auto)]
        mode: CliMode,
        /// Session id for conversation memory.
        #[arg(long, default_value = "cli")]
        session: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    /// Run all steps, unless the sensitivity gate blocks the plan.
    Auto,
    /// Run only the first step and report what remains.
    Step,
    /// Produce the plan without running anything.
    Plan,
}

impl From<CliMode> for ExecutionMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Auto => ExecutionMode::Auto,
            CliMode::Step => ExecutionMode::StepByStep,
            CliMode::Plan => ExecutionMode::PlanOnly,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config = load_config(&cli.config)?;
            migrate::run_migrations(&config).await?;
            println!("Database initialized at {}", config.db.path.display());
        }

        Commands::Add {
            dataset,
            file,
            metadata,
        } => {
            let config = load_config(&cli.config)?;
            let content = std::fs::read_to_string(&file)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());
            let metadata: serde_json::Value = match metadata {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::json!({}),
            };

            let store = open_store(&config).await?;
            let doc_id = store
                .add_document(&dataset, &filename, &content, &metadata)
                .await?;
            println!("added {} to '{}'", filename, dataset);
            println!("  id: {}", doc_id);
        }

        Commands::Query {
            dataset,
            text,
            top_k,
        } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&config).await?;
            let hits = store
                .query(
                    &dataset,
                    &text,
                    top_k.unwrap_or(config.retrieval.default_top_k),
                )
                .await?;

            if hits.is_empty() {
                println!("No results.");
            } else {
                for (i, hit) in hits.iter().enumerate() {
                    println!("{}. [{:.3}] {}", i + 1, hit.similarity, hit.filename);
                    println!("   {}", hit.content.replace('\n', " ").trim());
                }
            }
        }

        Commands::Datasets => {
            let config = load_config(&cli.config)?;
            let store = open_store(&config).await?;
            let datasets = store.list_datasets().await?;
            if datasets.is_empty() {
                println!("No datasets.");
            } else {
                for (name, count) in datasets {
                    println!("{:<16} {} document(s)", name, count);
                }
            }
        }

        Commands::Info { dataset } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&config).await?;
            let info = store.dataset_info(&dataset).await?;
            println!("dataset: {}", info.dataset);
            println!("  documents: {}", info.document_count);
            println!("  chunks:    {}", info.chunk_count);
            for doc in &info.documents {
                println!("  - {} ({})", doc.filename, doc.created_at);
            }
        }

        Commands::Show { id } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&config).await?;
            match store.get_document(&id).await? {
                Some(doc) => {
                    println!("# {} ({})", doc.filename, doc.dataset);
                    if doc.metadata_json != "{}" {
                        println!("metadata: {}", doc.metadata_json);
                    }
                    println!();
                    println!("{}", doc.content);
                }
                None => println!("no document with id {}", id),
            }
        }

        Commands::Forget { document, dataset } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&config).await?;
            match (document, dataset) {
                (Some(id), None) => {
                    if store.delete_document(&id).await? {
                        println!("deleted document {}", id);
                    } else {
                        println!("no document with id {}", id);
                    }
                }
                (None, Some(name)) => {
                    let removed = store.delete_dataset(&name).await?;
                    println!("deleted dataset '{}' ({} document(s))", name, removed);
                }
                _ => anyhow::bail!("specify exactly one of --document or --dataset"),
            }
        }

        Commands::Stats => {
            let config = load_config(&cli.config)?;
            stats::run_stats(&config).await?;
        }

        Commands::Ask {
            text,
            mode,
            session,
        } => {
            let config = load_config(&cli.config)?;
            run_ask(&config, &text, mode.into(), &session).await?;
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<RetrievalStore>> {
    let pool = db::open_pool(&config.db).await?;
    migrate::apply_schema(&pool).await?;
    let embedder = embedding::create_embedder(&config.embedding)?;
    Ok(Arc::new(RetrievalStore::new(
        pool,
        embedder,
        config.chunking.clone(),
    )))
}

async fn run_ask(
    config: &Config,
    text: &str,
    mode: ExecutionMode,
    session: &str,
) -> Result<()> {
    if !config.reasoning.is_enabled() {
        anyhow::bail!("'sk ask' requires a reasoning provider. Set [reasoning] in config.");
    }

    let store = open_store(config).await?;
    let memory = Arc::new(SqliteMemory::new(store.pool().clone()));
    let reasoner = reasoning::create_reasoner(&config.reasoning)?;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(KnowledgeTool::new(
        Arc::clone(&store),
        config.retrieval.knowledge_dataset.clone(),
        config.retrieval.scratch_dataset.clone(),
        config.retrieval.default_top_k,
    )));
    registry.register(Arc::new(MemoryTool::new(memory.clone())));

    let orchestrator = Orchestrator::new(
        IntentDetector::new(),
        ContextAssembler::new(
            Arc::clone(&store),
            memory.clone(),
            config.retrieval.clone(),
            config.memory.clone(),
        ),
        PlanGenerator::new(reasoner),
        StepExecutor::new(registry),
        memory,
    );

    let result = orchestrator.handle(session, text, mode).await;

    println!(
        "intention: {} (confidence {:.2}{})",
        result.plan.intention,
        result.plan.confidence,
        if result.plan.degraded {
            ", degraded"
        } else {
            ""
        }
    );

    if !result.plan.steps.is_empty() {
        println!("plan:");
        for (i, step) in result.plan.steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step.action);
        }
    }

    if result.requires_confirmation {
        println!("gated: plan requires confirmation (re-run with --mode step to walk through it)");
    }

    for step in &result.executed {
        match step.status {
            StepStatus::Success => println!("  ok    {}", step.action),
            StepStatus::Denied => println!("  denied {} ({})", step.action, step.data["reason"]),
            StepStatus::Error => println!(
                "  error {} ({})",
                step.action,
                step.error.as_deref().unwrap_or("unknown")
            ),
        }
    }
    if result.remaining_steps > 0 {
        println!("  {} step(s) remaining", result.remaining_steps);
    }

    println!();
    println!("{}", result.response);
    Ok(())
}
