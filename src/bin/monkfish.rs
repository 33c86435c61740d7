use clap::{Parser, Subcommand};
use monkfish::{run_uci_engine, MonkFishConfig, RequirementsReport, DEFAULT_CONFIG_FILE};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Draw-seeking UCI engine backed by Stockfish
///
/// Add the binary to any UCI-compatible GUI. It answers with the most recent
/// analysed move whose evaluation is within the drawing threshold.
///
/// UCI Options:
/// - Hash: Hash table size in MB (1-2048, default 128)
/// - Threads: Number of search threads (1-8, default 1)
/// - Ponder: Accepted and stored, pondering is not performed
/// - MonkFish_Skill: Stockfish skill level (0-20)
/// - Drawing_Threshold: Maximum |evaluation| in hundredths of a pawn (0-50)
/// - Search_Depth: Default search depth (1-10)
/// - MultiPV: Number of analysed lines (1-100)
/// - Use_NNUE: Let Stockfish use its neural evaluation
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file, created with defaults when missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Stockfish executable, overrides engine.stockfish_path
    #[arg(short, long)]
    engine: Option<PathBuf>,

    /// Log filter for stderr output (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Verify that the engine and configuration are usable, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Some(Command::Check) = args.command {
        let report = RequirementsReport::collect(&args.config, args.engine.as_deref());
        for line in report.lines() {
            println!("{line}");
        }
        report.engine?;
        return Ok(());
    }

    let mut config = MonkFishConfig::load(&args.config);
    if let Some(engine) = args.engine {
        config.engine.stockfish_path = engine;
    }

    info!("MonkFish starting with engine {}", config.engine.stockfish_path.display());
    run_uci_engine(config).await?;
    Ok(())
}
