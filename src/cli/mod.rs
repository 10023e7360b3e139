//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for ScreenKeeper.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "screenkeeper")]
#[command(about = "ScreenKeeper Background Session Keeper")]
#[command(long_about = "Keeps a screen-sharing session alive in the background")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Dry-run mode: show configuration without starting the keeper
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the session keeper console
    #[command(hide = true)]
    Run,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show default configuration
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Check if we're running the keeper console
    pub fn is_run_mode(&self) -> bool {
        matches!(self.command(), Commands::Run)
    }

    /// Adjust log level based on verbose flag
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }

    /// Check if we're running in dry-run mode
    pub fn is_dry_run_mode(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["screenkeeper"]);
        assert!(cli.is_run_mode());
        assert_eq!(cli.effective_log_level(), "info");
    }

    #[test]
    fn test_verbose_overrides_log_level() {
        let cli = Cli::parse_from(["screenkeeper", "--verbose"]);
        assert_eq!(cli.effective_log_level(), "debug");
    }

    #[test]
    fn test_config_show_subcommand() {
        let cli = Cli::parse_from(["screenkeeper", "config", "show"]);
        assert!(matches!(
            cli.command(),
            Commands::Config {
                action: Some(ConfigAction::Show)
            }
        ));
    }
}
