//! mip - Mip pyramid generation CLI
//!
//! Builds the full reduction chain of an image on the best available
//! compute device and writes every level to disk.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, Args};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "mip")]
#[command(author, version, about = "Mip pyramid generation CLI")]
#[command(long_about = "
Builds mip pyramids on GPU (wgpu) with automatic CPU fallback.

Examples:
  mip generate photo.png -o mips/            # full chain, nearest
  mip generate photo.png -o mips/ -s linear  # bilinear reduction
  mip generate photo.png -o mips/ -b cpu     # force CPU backend
  mip probe                                  # list compute backends
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the full mip pyramid of an image
    #[command(visible_alias = "g")]
    Generate(GenerateArgs),

    /// List compute backends and the selected device
    #[command(visible_alias = "p")]
    Probe,
}

#[derive(Args)]
struct GenerateArgs {
    /// Input image (PNG or JPEG)
    input: PathBuf,

    /// Output directory for level_<i>.png files
    #[arg(short, long)]
    output: PathBuf,

    /// Sampling strategy: nearest, linear
    #[arg(short, long, default_value = "nearest")]
    strategy: String,

    /// Backend: auto, cpu, wgpu
    #[arg(short, long, default_value = "auto")]
    backend: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args, cli.verbose),
        Commands::Probe => commands::probe::run(),
    }
}
