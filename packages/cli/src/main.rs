mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{inspect, normalize, sanitize, InspectArgs, NormalizeArgs, SanitizeArgs};
use tracing_subscriber::EnvFilter;

/// Berry CLI - clean, normalize and inspect rich-text markup offline
#[derive(Parser, Debug)]
#[command(name = "berry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log pipeline decisions (same as BERRY_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Strip markup the editor would never keep
    Sanitize(SanitizeArgs),

    /// Rewrite markup in the canonical form the editor produces
    Normalize(NormalizeArgs),

    /// Show the document model of markup files
    Inspect(InspectArgs),
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("BERRY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| anyhow::anyhow!("Cannot get current directory: {}", e))?;

    match cli.command {
        Command::Sanitize(args) => sanitize(args, &cwd),
        Command::Normalize(args) => normalize(args, &cwd),
        Command::Inspect(args) => inspect(args, &cwd),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
