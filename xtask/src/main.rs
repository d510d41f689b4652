// Host tooling: unwrap/expect/panic are acceptable outside the decoder core.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod decode;
mod synth;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "AC'97 link decoder development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a raw logic capture (one byte per sample, bit n = probe n)
    Decode(decode::DecodeArgs),
    /// Write a synthetic AC-link capture with register read traffic
    Synth {
        /// Output file
        output: PathBuf,
        /// Number of frames to generate
        #[arg(long, default_value_t = 8)]
        frames: usize,
        /// Idle BIT_CLK cycles before the first frame
        #[arg(long, default_value_t = 4)]
        lead: usize,
    },
    /// Check the decoder builds for host and no_std targets, and its docs
    Check,
    /// Run all tests (unit, integration, and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode(args) => decode::run(&args),
        Commands::Synth {
            output,
            frames,
            lead,
        } => synth::run(&output, frames, lead),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
    }
}
