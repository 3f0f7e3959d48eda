//! Command-line interface module for mvgo.
//!
//! This module handles start-up:
//! - Argument parsing
//! - Loading the configuration and the rule table
//! - Logging setup
//! - Wiring the termination signal into the scan loop

use crate::config::{Config, ConfigError, DEFAULT_CONFIG_FILE};
use crate::logging;
use crate::output::OutputFormatter;
use crate::rules::{DEFAULT_RULES_FILE, RuleTable, RulesError};
use crate::scanner::Scanner;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use thiserror::Error;

/// Poll a directory tree and move files according to ordered glob rules.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "mvgo", version)]
pub struct Args {
    /// Configuration file (JSON, or TOML with a .toml extension).
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Rules file, one `pattern | destination` per line.
    #[arg(default_value = DEFAULT_RULES_FILE)]
    pub rules: PathBuf,

    /// Run a single scan, print a summary and exit.
    #[arg(long)]
    pub once: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors that stop the process before the first scan.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Error loading config: {0}")]
    Config(#[from] ConfigError),
    #[error("Error loading rules: {0}")]
    Rules(#[from] RulesError),
}

/// Loads everything, then scans until terminated (or once with `--once`).
///
/// # Errors
///
/// Only configuration and rules loading failures are returned. Everything
/// that goes wrong after start-up is logged and survived.
pub fn run(args: Args) -> Result<(), StartupError> {
    let config = Config::load(&args.config)?;
    let _log_guard = logging::init(&config, args.verbose);

    let rules = RuleTable::load(&args.rules).inspect_err(|e| tracing::error!("{}", e))?;
    tracing::info!(
        rules = rules.len(),
        path = %args.rules.display(),
        "Loaded rules"
    );

    let mut scanner = Scanner::new(config, rules);

    if args.once {
        let report = scanner.scan_once();
        scanner.persist();
        OutputFormatter::scan_summary(&report);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let handler_tx = shutdown_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = handler_tx.send(());
    }) {
        tracing::warn!(error = %e, "Could not install shutdown handler, state is only saved after moves");
    }

    scanner.run(&shutdown_rx);
    drop(shutdown_tx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["mvgo"]).unwrap();

        assert_eq!(args.config, PathBuf::from("mvGo.json"));
        assert_eq!(args.rules, PathBuf::from("mvGo.rules"));
        assert!(!args.once);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_positional_overrides() {
        let args = Args::try_parse_from(["mvgo", "/etc/mvgo.json", "/etc/mvgo.rules", "--once"])
            .unwrap();

        assert_eq!(args.config, PathBuf::from("/etc/mvgo.json"));
        assert_eq!(args.rules, PathBuf::from("/etc/mvgo.rules"));
        assert!(args.once);
    }

    #[test]
    fn test_args_reject_third_positional() {
        assert!(Args::try_parse_from(["mvgo", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_run_fails_on_missing_config() {
        let dir = TempDir::new().unwrap();
        let args = Args {
            config: dir.path().join("missing.json"),
            rules: dir.path().join("mvGo.rules"),
            once: true,
            verbose: false,
        };

        let err = run(args).unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::NotFound(_))));
        assert!(err.to_string().starts_with("Error loading config"));
    }

    #[test]
    fn test_startup_error_wraps_rules_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mvGo.rules");
        fs::create_dir(&path).unwrap();

        let err: StartupError = RuleTable::load(&path).unwrap_err().into();
        assert!(err.to_string().starts_with("Error loading rules"));
    }
}
