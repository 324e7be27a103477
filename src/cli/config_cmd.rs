//! Config command - manage ragsift configuration

use clap::{Args, Subcommand};

use ragsift::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = Config::load();
            let path = Config::config_path();

            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", path.display());
            }
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }

        ConfigCommands::Init { force } => {
            let path = Config::config_path();

            if !Config::write_example(force)? {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }

            println!("Created config file at {}", path.display());
            println!();
            println!("Edit the file to customize the embedding provider and query defaults.");
            println!();
            println!("  # Ollama (local model server)");
            println!("  provider = \"ollama\"");
            println!("  model = \"nomic-embed-text\"  # or \"mxbai-embed-large\"");
            println!();
            println!("  # Offline hashed embeddings, no server needed");
            println!("  provider = \"hashed\"");
        }

        ConfigCommands::Path => {
            println!("{}", Config::config_path().display());
        }
    }

    Ok(())
}
