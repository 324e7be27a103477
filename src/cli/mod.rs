//! CLI module - command definitions and handlers

mod config_cmd;
mod plan;
mod search;

use clap::{Args, Parser, Subcommand};

use ragsift::retrieval::{parse_metadata_filter, parse_tags, QuerySettings};

pub use config_cmd::ConfigArgs;
pub use plan::PlanArgs;
pub use search::SearchArgs;

/// ragsift - adaptive filtered retrieval over your documents
#[derive(Parser)]
#[command(name = "ragsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load documents and run one filtered query against them
    Search(SearchArgs),

    /// Show how many candidates a query would fetch
    Plan(PlanArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Search(args) => search::run(args).await,
            Commands::Plan(args) => plan::run(args),
            Commands::Config(args) => config_cmd::run(args),
        }
    }
}

/// Query knobs shared by `search` and `plan`
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Number of results to return, 1-20 [default: from config]
    #[arg(long, short = 'k')]
    pub max_chunks: Option<usize>,

    /// Minimum similarity score, 0.0-1.0 [default: from config]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Only keep chunks carrying any of these tags (repeatable or comma separated)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Only keep chunks whose metadata matches, e.g. year=2024 or author="Ada" (repeatable)
    #[arg(long, short = 'f')]
    pub filter: Vec<String>,
}

impl QueryArgs {
    /// Merge with configured defaults. Range checks happen at query time.
    pub fn settings(&self, defaults: &QuerySettings) -> anyhow::Result<QuerySettings> {
        let tags: Vec<String> = self
            .tags
            .iter()
            .flat_map(|t| parse_tags(t))
            .collect();

        Ok(QuerySettings::new(
            self.max_chunks.unwrap_or(defaults.max_chunks),
            self.threshold.unwrap_or(defaults.similarity_threshold),
        )
        .with_tags(tags)
        .with_metadata_filter(parse_metadata_filter(&self.filter)?))
    }
}
