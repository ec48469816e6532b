use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use skillpack::cli;

#[derive(Parser)]
#[command(name = "skillpack", version)]
#[command(about = "Generate skill bundles from source repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a skill bundle for a repository
    Generate {
        /// Repository URL or local path
        source: String,

        /// Output directory (default: ./skills/<name>)
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Project type (python, node, rust, go, ruby, java). Auto-detected
        /// if not specified.
        #[arg(long = "type")]
        project_type: Option<String>,

        /// Generate wrapper scripts implementing the runtime contract
        #[arg(long)]
        with_wrapper: bool,

        /// Vendor a copy of the source tree into the bundle
        #[arg(long)]
        vendor: bool,

        /// Keep the cloned repository (for URLs)
        #[arg(long)]
        keep_clone: bool,

        /// Path to config file (defaults to ./skillpack.toml or
        /// ~/.config/skillpack/config.toml)
        #[arg(long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            source,
            output,
            project_type,
            with_wrapper,
            vendor,
            keep_clone,
            config,
        } => {
            cli::generate::run(
                source,
                output,
                project_type,
                with_wrapper,
                vendor,
                keep_clone,
                config,
            )?;
        }
    }

    Ok(())
}
