mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, components, locate, scan, strip, watch, ApplyArgs, ComponentsArgs, LocateArgs, ScanArgs,
    StripArgs, WatchArgs,
};
use tracing_subscriber::EnvFilter;

/// Tessera CLI - keep JSX/TSX sources in sync with structural edits
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assign identities to every element and list the template map
    Scan(ScanArgs),

    /// Show where an element identity lives
    Locate(LocateArgs),

    /// Apply a JSON batch of edit requests
    Apply(ApplyArgs),

    /// Print a file without identity attributes
    Strip(StripArgs),

    /// List the components a file exports
    Components(ComponentsArgs),

    /// Report outside changes to source files until interrupted
    Watch(WatchArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Scan(args) => scan(args).await,
        Command::Locate(args) => locate(args).await,
        Command::Apply(args) => apply(args).await,
        Command::Strip(args) => strip(args),
        Command::Components(args) => components(args),
        Command::Watch(args) => watch(args).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
