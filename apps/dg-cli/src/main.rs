//! # deckguard
//!
//! Operator CLI for deckguard policy files.
//!
//! - `deckguard show` — print the effective policy and its fingerprint
//! - `deckguard check` — evaluate one request, exit non-zero on deny
//! - `deckguard validate` — list what normalization changed
//! - `deckguard watch` — hot-reload the file and report each new snapshot

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// deckguard — inspect and test agent permission policies.
#[derive(Parser)]
#[command(name = "deckguard", version, about)]
struct Cli {
    /// Policy file (.json, .toml, .yaml/.yml).
    #[arg(long, short, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective policy.
    Show,
    /// Evaluate a single request against the policy.
    Check(commands::check::CheckArgs),
    /// Load the file and report normalization warnings.
    Validate,
    /// Watch the file and reload on change until interrupted.
    Watch {
        /// Seconds between snapshot checks.
        #[arg(long, default_value = "1")]
        interval: u64,
    },
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("dg_policy=info".parse()?)
        .add_directive("dg_config=info".parse()?)
        .add_directive("deckguard=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;

    match &cli.command {
        Commands::Show => commands::show::execute(&cli.config),
        Commands::Check(args) => commands::check::execute(&cli.config, args),
        Commands::Validate => commands::validate::execute(&cli.config),
        Commands::Watch { interval } => commands::watch::execute(&cli.config, *interval),
    }
}
