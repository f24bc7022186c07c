//! # ShellAI CLI
//!
//! The `shellai` binary collects system-diagnostic text into flat files and
//! answers natural-language questions about them through a locally hosted
//! Ollama model.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shellai collect` | Run the diagnostic catalog and save artifacts |
//! | `shellai ask` | Ask questions (interactive or `--question`) |
//! | `shellai status` | Show collected artifacts and index state |
//! | `shellai refresh` | Force a rebuild of the persisted index |
//! | `shellai cleanup` | Delete raw artifacts once an index exists |
//! | `shellai config` | Show or edit the configuration |
//! | `shellai setup` | Check Ollama availability and configuration |
//!
//! All commands accept a global `--config <path>` flag (default
//! `config.yaml`); a missing file is created with the defaults.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shellai::cleanup::run_cleanup;
use shellai::collect::run_collect;
use shellai::config::{run_config, ConfigStore};
use shellai::query::{run_ask, run_refresh};
use shellai::setup::run_setup;
use shellai::status::run_status;

/// ShellAI — natural-language system queries over collected diagnostics.
#[derive(Parser)]
#[command(
    name = "shellai",
    about = "Collect system information and query it with a local LLM",
    version,
    long_about = "ShellAI shells out to a fixed catalog of diagnostic commands (uname, df, \
    free, ps, ...), saves their output as plain-text artifacts, builds a persisted vector \
    index over them via a local Ollama instance, and answers natural-language questions \
    grounded in that index."
)]
struct Cli {
    /// Path to the YAML configuration file.
    ///
    /// Created with defaults on first use. Covers the Ollama base URL,
    /// model names, and the artifact/storage directories.
    #[arg(long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect system information for querying.
    ///
    /// Runs every command in the diagnostic catalog (os, disk, memory,
    /// processes, network, uptime, cpu, mounts, users, environment) and
    /// writes one text artifact per successful command. Failed commands are
    /// skipped; any artifact from a previous run is left in place.
    Collect {
        /// Directory to save system information files (overrides config).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Add a custom command as 'name:command' (repeatable).
        #[arg(long = "custom-command")]
        custom_command: Vec<String>,
    },

    /// Ask natural-language questions about your system.
    ///
    /// Loads the persisted index if present, otherwise builds one from the
    /// collected artifacts. With `--question` answers once and exits;
    /// without it starts an interactive session.
    Ask {
        /// Directory containing system info files (overrides config).
        #[arg(long)]
        system_info_dir: Option<PathBuf>,

        /// Ollama model to use for answer synthesis (overrides config).
        #[arg(long)]
        model: Option<String>,

        /// Single question to ask (non-interactive mode).
        #[arg(long)]
        question: Option<String>,

        /// Force an index rebuild before answering.
        #[arg(long)]
        refresh: bool,
    },

    /// Show status of collected system information.
    ///
    /// Lists the artifact files with sizes and reports whether a persisted
    /// index exists, including its build metadata.
    Status {
        /// Directory containing system info files (overrides config).
        #[arg(long)]
        system_info_dir: Option<PathBuf>,
    },

    /// Force a rebuild of the persisted index from current artifacts.
    Refresh {
        /// Directory containing system info files (overrides config).
        #[arg(long)]
        system_info_dir: Option<PathBuf>,

        /// Ollama model to bind (overrides config).
        #[arg(long)]
        model: Option<String>,
    },

    /// Delete raw text artifacts once a persisted index exists.
    ///
    /// Refuses to delete anything while no complete persisted index is
    /// present. Asks for confirmation unless `--force` is given. The
    /// persisted index itself is never removed.
    Cleanup {
        /// Directory containing system info files (overrides config).
        #[arg(long)]
        system_info_dir: Option<PathBuf>,

        /// Skip the interactive confirmation.
        #[arg(long)]
        force: bool,
    },

    /// Show or edit the configuration file.
    Config {
        /// Print the merged configuration.
        #[arg(long)]
        show: bool,

        /// Rewrite the configuration file with the defaults.
        #[arg(long)]
        reset: bool,

        /// Set a value as 'dotted.key=value' (repeatable), then save.
        #[arg(long = "set")]
        set: Vec<String>,
    },

    /// Check and set up requirements for ShellAI.
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut store = ConfigStore::load(&cli.config)?;

    // Validation happens per-command: `config` must stay usable to repair
    // a file that no longer passes `typed()`.
    match cli.command {
        Commands::Collect {
            output_dir,
            custom_command,
        } => {
            let config = store.typed()?;
            let dir = output_dir.unwrap_or_else(|| config.system_info.output_dir.clone());
            run_collect(&dir, &custom_command).await?;
        }
        Commands::Ask {
            system_info_dir,
            model,
            question,
            refresh,
        } => {
            let config = store.typed()?;
            let dir = system_info_dir.unwrap_or_else(|| config.system_info.output_dir.clone());
            let model = model.unwrap_or_else(|| config.ollama.default_model.clone());
            run_ask(&config, &dir, &model, question.as_deref(), refresh).await?;
        }
        Commands::Status { system_info_dir } => {
            let config = store.typed()?;
            let dir = system_info_dir.unwrap_or_else(|| config.system_info.output_dir.clone());
            run_status(&dir, &config.system_info.storage_dir)?;
        }
        Commands::Refresh {
            system_info_dir,
            model,
        } => {
            let config = store.typed()?;
            let dir = system_info_dir.unwrap_or_else(|| config.system_info.output_dir.clone());
            let model = model.unwrap_or_else(|| config.ollama.default_model.clone());
            run_refresh(&config, &dir, &model).await?;
        }
        Commands::Cleanup {
            system_info_dir,
            force,
        } => {
            let config = store.typed()?;
            let dir = system_info_dir.unwrap_or_else(|| config.system_info.output_dir.clone());
            run_cleanup(&dir, &config.system_info.storage_dir, force)?;
        }
        Commands::Config { show, reset, set } => {
            run_config(&mut store, show, reset, &set)?;
        }
        Commands::Setup => {
            let config = store.typed()?;
            run_setup(&config, &cli.config).await?;
        }
    }

    Ok(())
}
