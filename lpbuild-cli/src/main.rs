//! lpbuild: keep charm build recipes in line with declared config.
//!
//! # Usage
//!
//! ```text
//! lpbuild [--config-dir <dir>] [-p <group>]... [-c <charm>]... list
//! lpbuild ... config
//! lpbuild ... diff [--detail] [--json]
//! lpbuild ... show
//! lpbuild ... sync --i-really-mean-it
//! ```
//!
//! Exit codes: `0` success, `1` configuration or state-file error (and
//! unconfirmed `sync`), `2` reconciliation failure.

mod commands;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{
    config::ConfigArgs, diff::DiffArgs, list::ListArgs, show::ShowArgs, sync::SyncArgs,
    GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "lpbuild",
    version,
    about = "Reconcile charm build recipes with declared project config",
    long_about = None,
)]
struct Cli {
    /// Directory containing the project group files.
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    /// Restrict to the named project group (repeatable).
    #[arg(short = 'p', long = "group", global = true)]
    groups: Vec<String>,

    /// Restrict to the named project (repeatable).
    #[arg(short = 'c', long = "charm", global = true)]
    charms: Vec<String>,

    /// Log level: error, warn, info, debug or trace.
    #[arg(long, global = true, default_value = "error")]
    log: log::LevelFilter,

    /// Remote state file (default: ~/.lpbuild/remote-state.json).
    #[arg(long, global = true)]
    remote_state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the declared projects.
    List(ListArgs),

    /// Print the normalized declared config as YAML.
    Config(ConfigArgs),

    /// Summarize what sync would change.
    Diff(DiffArgs),

    /// Show the remote recipes for the declared branches.
    Show(ShowArgs),

    /// Create and update recipes to match the declared config.
    Sync(SyncArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new().filter_level(cli.log).init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let globals = GlobalArgs {
        remote_state: match cli.remote_state {
            Some(path) => path,
            None => {
                let home = dirs::home_dir().context("could not determine home directory")?;
                lpbuild_sync::state_store::default_path_at(&home)
            }
        },
        config_dir: cli.config_dir,
        groups: cli.groups,
        charms: cli.charms,
    };

    match cli.command {
        Commands::List(args) => args.run(&globals),
        Commands::Config(args) => args.run(&globals),
        Commands::Diff(args) => args.run(&globals),
        Commands::Show(args) => args.run(&globals),
        Commands::Sync(args) => args.run(&globals),
    }
}
