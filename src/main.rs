use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use copilot_core::bootstrap::{self, build_options, create_agent, create_embedder};
use copilot_core::{Config, Session};
use copilot_index::{HybridRetriever, IndexBuilder, IndexReport, Retriever, SearchResult};
use copilot_llm::any::AnyProvider;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const PREVIEW_LINES: usize = 10;

#[derive(Debug, Parser)]
#[command(name = "repo-copilot", version, about = "Ask questions about a code repository")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the configured embedding backend instead of the mock embedder.
    #[arg(long, global = true)]
    use_real_embedding: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the keyword and vector indexes for a repository.
    Index { repo: PathBuf },
    /// Run a hybrid search and print ranked chunks.
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Answer one question from the indexed repository.
    Ask { question: String },
    /// Interactive questions; `/repo <path>` indexes and switches repositories.
    Chat {
        /// Index this repository before the first question.
        #[arg(long)]
        repo: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config = bootstrap::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Index { repo } => {
            let report = index_repo(&config, &repo, cli.use_real_embedding).await?;
            print_report(&repo, &report);
        }
        Command::Search { query, top_k } => {
            search(&config, &query, top_k, cli.use_real_embedding).await?;
        }
        Command::Ask { question } => {
            let agent = create_agent(&config, cli.use_real_embedding).await?;
            let result = agent.answer(&question).await;
            agent.close().await;
            println!("{}", result?);
        }
        Command::Chat { repo } => chat(&config, repo, cli.use_real_embedding).await?,
    }

    Ok(())
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn index_repo(config: &Config, repo: &Path, use_real: bool) -> anyhow::Result<IndexReport> {
    let embedder = create_embedder(config, use_real)?;
    let builder = IndexBuilder::new(embedder, build_options(config));
    builder
        .build(repo)
        .await
        .with_context(|| format!("indexing {}", repo.display()))
}

fn print_report(repo: &Path, report: &IndexReport) {
    println!("Indexed {}", repo.display());
    println!(
        "  files: {} scanned, {} skipped",
        report.files_scanned, report.files_failed
    );
    println!("  chunks: {}", report.chunks);
    println!(
        "  vectors: {} (dimension {}{})",
        report.vectors,
        report.dimension,
        if report.recreated_collection {
            ", collection recreated"
        } else {
            ""
        }
    );
    println!("  took {} ms", report.duration_ms);
}

async fn search(config: &Config, query: &str, top_k: usize, use_real: bool) -> anyhow::Result<()> {
    let retriever = bootstrap::open_retriever(config, use_real).await?;
    let results = retriever.search(query, top_k).await;
    retriever.close().await;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} results for '{query}':\n", results.len());
    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }
    Ok(())
}

fn print_result(rank: usize, result: &SearchResult) {
    let chunk = &result.chunk;
    let rule = "-".repeat(40);
    println!("{rule}");
    println!(
        "Result #{rank} | Score: {:.4} | Source: {}",
        result.score, result.source
    );
    println!("File: {}", chunk.location());
    println!(
        "Type: {} | Name: {}",
        chunk.chunk_type,
        chunk.name.as_deref().unwrap_or("N/A")
    );
    println!("{}", "-".repeat(20));
    let lines: Vec<&str> = chunk.content.lines().collect();
    println!("{}", lines[..lines.len().min(PREVIEW_LINES)].join("\n"));
    if lines.len() > PREVIEW_LINES {
        println!("...");
    }
    println!("{rule}\n");
}

async fn switch_repo(
    session: &mut Session<HybridRetriever, AnyProvider>,
    config: &Config,
    repo: PathBuf,
    use_real: bool,
) -> anyhow::Result<()> {
    let name = repo
        .file_name()
        .map_or_else(|| repo.display().to_string(), |n| n.to_string_lossy().into_owned());
    session
        .switch_repo(name, || async {
            let report = index_repo(config, &repo, use_real).await?;
            print_report(&repo, &report);
            create_agent(config, use_real).await
        })
        .await
}

async fn chat(config: &Config, repo: Option<PathBuf>, use_real: bool) -> anyhow::Result<()> {
    let mut session = Session::new();
    match repo {
        Some(repo) => switch_repo(&mut session, config, repo, use_real).await?,
        None => {
            let agent = create_agent(config, use_real).await?;
            session
                .switch_repo("current", || async { Ok::<_, anyhow::Error>(agent) })
                .await?;
        }
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if matches!(line, "/quit" | "/exit") {
            break;
        }
        if let Some(path) = line.strip_prefix("/repo") {
            let path = path.trim();
            if path.is_empty() {
                println!("usage: /repo <path>");
                continue;
            }
            if let Err(e) = switch_repo(&mut session, config, PathBuf::from(path), use_real).await {
                println!("Error: {e:#}");
            }
            continue;
        }

        println!("\n{}\n", session.respond(line).await);
    }

    session.close().await;
    Ok(())
}
