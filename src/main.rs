mod commands;

use clap::{Parser, Subcommand};
use sops_filter::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sops-filter")]
#[command(version)]
#[command(about = "Keep Kubernetes Secrets SOPS-encrypted in git", long_about = None)]
struct Cli {
    /// Log decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean filter (used internally by git)
    Clean,

    /// Smudge filter (used internally by git)
    Smudge,

    /// Configure the filter driver in the current repository
    Install {
        /// Command git runs for the filter
        #[arg(long, default_value = "sops-filter")]
        program: String,
    },

    /// Remove the filter driver from the current repository
    Uninstall,
}

fn main() {
    let cli = Cli::parse();

    // stdout carries filter output, so logs go to stderr only
    let filter = EnvFilter::try_from_env("SOPS_FILTER_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("sops_filter=debug")
        } else {
            EnvFilter::new("sops_filter=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Clean => commands::clean(),
        Commands::Smudge => commands::smudge(),
        Commands::Install { program } => commands::install(&program),
        Commands::Uninstall => commands::uninstall(),
    }
}
