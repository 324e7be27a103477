//! Search command - load documents, ingest them, run one filtered query

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use ragsift::backend::BackendType;
use ragsift::chunker::DocumentLoader;
use ragsift::config::Config;
use ragsift::embedding::{EmbeddingMode, EmbeddingModel, EmbeddingProvider};
use ragsift::retrieval::{CancellationToken, QueryOutcome, RetrievalEngine, ScoredChunk};

use super::QueryArgs;

/// Files loaded and ingested at the same time
const INGEST_CONCURRENCY: usize = 4;

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Files or directories to search
    #[arg(required = true)]
    pub docs: Vec<PathBuf>,

    #[command(flatten)]
    pub settings: QueryArgs,

    /// Vector index backend (memory, hnsw)
    #[arg(long, default_value = "memory")]
    pub backend: String,

    /// Embedding provider (ollama, hashed) [default: from config]
    #[arg(long)]
    pub provider: Option<String>,

    /// Embedding model [default: from config]
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama host for embeddings
    #[arg(long, env = "OLLAMA_HOST")]
    pub host: Option<String>,

    /// Embedding dimensions
    #[arg(long)]
    pub dimensions: Option<usize>,

    /// File types to include (e.g., ".md,.txt")
    #[arg(long)]
    pub file_types: Option<String>,

    /// Include hidden files
    #[arg(long)]
    pub include_hidden: bool,

    /// Similarity-search timeout in seconds [default: from config]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Show tags and metadata in results
    #[arg(long)]
    pub show_metadata: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let config = Config::load();

    let settings = args.settings.settings(&config.query.settings())?;
    settings.validate()?;

    let backend: BackendType = args.backend.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let provider = args
        .provider
        .clone()
        .unwrap_or_else(|| config.embedding.provider.clone());
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| config.embedding.model.clone());
    let mode = EmbeddingMode::from_provider(
        &provider,
        args.host.clone().or(config.embedding.host.clone()),
        args.dimensions.or(config.embedding.dimensions),
    )?;
    let embedder = EmbeddingProvider::new(model, mode)?;
    let dimensions = embedder.dimensions();

    let index = backend.create(dimensions)?;
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.query.search_timeout());
    let engine = Arc::new(RetrievalEngine::new(index, Arc::new(embedder)).with_search_timeout(timeout));

    let mut loader = DocumentLoader::new(config.ingest.chunk_size, config.ingest.chunk_overlap)
        .with_max_file_size_kb(config.ingest.max_file_size_kb)
        .with_hidden(args.include_hidden);
    if let Some(types) = args.file_types.as_deref() {
        loader = loader.with_file_types(types.split(','));
    } else if let Some(types) = &config.ingest.file_types {
        loader = loader.with_file_types(types);
    }

    let files = loader.discover(&args.docs);
    if files.is_empty() {
        anyhow::bail!("No documents found to search");
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    progress.set_message("Ingesting documents...");

    let mut ingested = stream::iter(files)
        .map(|path| {
            let loader = loader.clone();
            let engine = engine.clone();
            async move {
                let loaded = tokio::task::spawn_blocking(move || loader.load_file(&path)).await??;
                match loaded {
                    Some(doc) => Ok::<_, anyhow::Error>(Some(engine.ingest(doc.into_request()).await?)),
                    None => Ok(None),
                }
            }
        })
        .buffer_unordered(INGEST_CONCURRENCY);

    let mut documents = 0usize;
    while let Some(result) = ingested.next().await {
        if result?.is_some() {
            documents += 1;
        }
        progress.inc(1);
    }

    let stats = engine.stats().await;
    progress.finish_with_message(format!(
        "Ingested {} documents ({} chunks)",
        documents, stats.chunks
    ));

    if documents == 0 {
        anyhow::bail!("No readable text found in the given documents");
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    info!(
        "Searching {} documents (max_chunks={}, threshold={})",
        stats.documents, settings.max_chunks, settings.similarity_threshold
    );
    let outcome = engine.query_text(&args.query, &settings, &cancel).await;
    ctrl_c.abort();

    let results = match outcome? {
        QueryOutcome::Ranked(results) => results,
        QueryOutcome::Cancelled => {
            warn!("Search cancelled, no results available");
            return Ok(());
        }
    };

    if args.format == "json" {
        print_json(&results)?;
    } else {
        print_text(&args, &results);
    }

    Ok(())
}

fn print_json(results: &[ScoredChunk]) -> anyhow::Result<()> {
    let json_results: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.chunk.id,
                "document_id": r.chunk.document_id,
                "filename": r.chunk.snapshot.filename,
                "score": r.score,
                "text": r.chunk.text,
                "tags": r.tags,
                "metadata": r.metadata,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json_results)?);
    Ok(())
}

fn print_text(args: &SearchArgs, results: &[ScoredChunk]) {
    if results.is_empty() {
        println!("\nNo results for '{}'", args.query);
        return;
    }

    println!("\nSearch results for '{}' (top {}):\n", args.query, results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. Score: {:.4}  {}",
            i + 1,
            result.score,
            result.chunk.snapshot.filename
        );

        if args.show_metadata {
            if !result.tags.is_empty() {
                let tags: Vec<&str> = result.tags.iter().map(String::as_str).collect();
                println!("   Tags: {}", tags.join(", "));
            }
            for (key, value) in &result.metadata {
                println!("   {}: {}", key, value);
            }
        }

        // Truncate text for display
        let display_text = if result.chunk.text.chars().count() > 200 {
            let head: String = result.chunk.text.chars().take(200).collect();
            format!("{}...", head)
        } else {
            result.chunk.text.clone()
        };
        println!("   {}", display_text);
        println!();
    }
}
