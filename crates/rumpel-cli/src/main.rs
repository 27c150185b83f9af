//! Rumpel CLI - write notes and share them from a HAT personal data store
//!
//! Provides commands for:
//! - Logging in to a HAT through the browser
//! - Listing, writing, editing and deleting notes
//! - Sharing notes to Facebook, Twitter and MarketSquare
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod terminal;

use commands::{
    auth::AuthCommand, completions::CompletionsCommand, config::ConfigCommand,
    notes::NotesCommand, AppContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "rumpel", version, about = "Notes and sharing for your HAT")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long = "yes", global = true)]
    assume_yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Write, share and delete notes
    #[command(subcommand)]
    Notes(NotesCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let mut ctx = AppContext::load(cli.config, format, cli.assume_yes, cli.quiet);

    // Setup tracing
    let filter = match cli.verbose {
        0 => ctx.config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    ctx.warn_invalid_config();

    let result = match &cli.command {
        Commands::Auth(cmd) => cmd.execute(&mut ctx).await,
        Commands::Notes(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(),
    };

    if let Err(e) = &result {
        ctx.formatter().error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
