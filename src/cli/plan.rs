//! Plan command - show the candidate pool a query would request

use clap::Args;

use ragsift::config::Config;
use ragsift::retrieval::plan_fetch_width;

use super::QueryArgs;

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub query: QueryArgs,
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let settings = args.query.settings(&config.query.settings())?;
    settings.validate()?;

    println!("max_chunks = {}", settings.max_chunks);
    println!("similarity_threshold = {}", settings.similarity_threshold);
    if !settings.tag_filter.is_empty() {
        let tags: Vec<&str> = settings.tag_filter.iter().map(String::as_str).collect();
        println!("tags (any) = {}", tags.join(", "));
    }
    for (key, value) in &settings.metadata_filter {
        println!("metadata (all) {} = {}", key, value);
    }
    println!("k_fetch = {}", plan_fetch_width(&settings));

    Ok(())
}
