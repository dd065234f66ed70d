use anyhow::Result;
use clap::{Parser, Subcommand};
use fakecall::cli;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Inspect call recordings written by fakecall recording sessions.
#[derive(Parser)]
#[command(name = "fakecall")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the calls in a recording
    Inspect {
        /// Path to the recording JSON file
        file: PathBuf,

        /// Only show calls whose method contains this text
        #[arg(short, long)]
        method: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Count calls per method in a recording
    Summary {
        /// Path to the recording JSON file
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env("FAKECALL_LOG").unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("fakecall={}", level))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Inspect { file, method, json } => {
            cli::inspect_recording(&file, method.as_deref(), json)
        }
        Commands::Summary { file, json } => cli::summarize_recording(&file, json),
    }
}
