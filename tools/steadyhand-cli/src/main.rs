//! SteadyHand CLI: tremor-smoothing mouse filter.
//!
//! Usage:
//!   steadyhand run [OPTIONS]          Start smoothing until the quit hotkey or Ctrl+C
//!   steadyhand calibrate [OPTIONS]    Run the guided calibration only
//!   steadyhand check                  Check platform support and configuration
//!   steadyhand config <ACTION>        Create, locate, or print the configuration

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use steadyhand_common::config::{config_file_path, AppConfig, LoggingConfig};

mod commands;
mod engine;

#[derive(Parser)]
#[command(
    name = "steadyhand",
    about = "Adaptive mouse smoothing for hand tremor",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the smoothing engine
    Run {
        /// Configuration file (defaults to the per-user config)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run the guided calibration before smoothing starts
        #[arg(long)]
        calibrate: bool,
    },

    /// Run the guided calibration and print the recommended thresholds
    Calibrate {
        /// Configuration file (defaults to the per-user config)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the new thresholds back to the configuration file
        #[arg(long)]
        save: bool,
    },

    /// Check platform support and configuration
    Check {
        /// Configuration file (defaults to the per-user config)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Target file (defaults to the per-user config)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the default configuration path
    Path,

    /// Print the effective configuration
    Show {
        /// Configuration file (defaults to the per-user config)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    fn config_path(&self) -> PathBuf {
        let explicit = match self {
            Commands::Run { config, .. }
            | Commands::Calibrate { config, .. }
            | Commands::Check { config } => config.clone(),
            Commands::Config { action } => match action {
                ConfigAction::Init { config, .. } | ConfigAction::Show { config } => {
                    config.clone()
                }
                ConfigAction::Path => None,
            },
        };
        explicit.unwrap_or_else(config_file_path)
    }
}

/// The config file's logging section when it loads, defaults otherwise.
fn logging_config(path: &Path, verbose: bool) -> LoggingConfig {
    let mut logging = AppConfig::load_from(path)
        .map(|config| config.logging)
        .unwrap_or_default();
    if verbose {
        logging.level = "debug".to_string();
    }
    logging
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.command.config_path();

    steadyhand_common::logging::init_logging(&logging_config(&config_path, cli.verbose));

    match cli.command {
        Commands::Run { calibrate, .. } => commands::run::run(config_path, calibrate).await,
        Commands::Calibrate { save, .. } => commands::calibrate::run(config_path, save).await,
        Commands::Check { .. } => commands::check::run(&config_path),
        Commands::Config { action } => match action {
            ConfigAction::Init { force, .. } => commands::config::init(&config_path, force),
            ConfigAction::Path => commands::config::path(&config_path),
            ConfigAction::Show { .. } => commands::config::show(&config_path),
        },
    }
}
