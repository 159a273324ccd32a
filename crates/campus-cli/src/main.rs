//! Command-line front end for the branch access guard
//!
//! Evaluates single requests, decodes tokens, prints the effective
//! configuration and runs a small guarded gateway.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    check::{self, CheckArgs},
    common,
    config,
    decode::{self, DecodeArgs},
    serve::{self, ServeArgs},
};

#[derive(Parser)]
#[command(name = "campus-guard")]
#[command(about = "Branch-scoped access checks for the campus API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "campus-guard.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one request and print the decision
    Check(CheckArgs),

    /// Decode a bearer token into caller claims
    Decode(DecodeArgs),

    /// Print the effective configuration
    Config,

    /// Run the demo gateway behind the guard
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = common::load_config(&cli.config)?;

    match cli.command {
        Commands::Check(args) => {
            if !check::run(&args, &config)? {
                return Ok(ExitCode::from(check::DENIED_EXIT_CODE));
            }
        }
        Commands::Decode(args) => decode::run(&args, &config)?,
        Commands::Config => config::run(&config)?,
        Commands::Serve(args) => serve::run(&args, &config).await?,
    }

    Ok(ExitCode::SUCCESS)
}
