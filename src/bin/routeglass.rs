use clap::{Parser, Subcommand};
use routeglass::*;
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::lookup::LookupArgs;
use commands::neighbors::NeighborsArgs;
use commands::serve::ServeArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.routeglass/routeglass.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table (default), markdown, json, json-pretty, json-line
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep all sources refreshed in the background until interrupted.
    Serve(ServeArgs),

    /// Look up routes whose network starts with the given prefix.
    Lookup(LookupArgs),

    /// Look up routes learned from the given neighbors.
    Neighbors(NeighborsArgs),

    /// Refresh all sources once and show route counts per source.
    Stats,

    /// Show the current configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.debug { Level::INFO } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match GlassConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(&config, args).await,
        Commands::Lookup(args) => commands::lookup::run(&config, args, cli.format).await,
        Commands::Neighbors(args) => commands::neighbors::run(&config, args, cli.format).await,
        Commands::Stats => commands::stats::run(&config, cli.format).await,
        Commands::Config(args) => commands::config::run(&config, args, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
