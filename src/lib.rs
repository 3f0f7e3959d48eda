//! mvgo - a polling file mover
//!
//! This library scans a directory tree at a fixed interval, matches every file
//! against an ordered list of glob rules, moves matching files to the rule's
//! destination, and remembers which paths it has already handled.

pub mod cli;
pub mod config;
pub mod logging;
pub mod mover;
pub mod output;
pub mod rules;
pub mod scanner;
pub mod state;

pub use config::{Config, ConfigError, SyslogConfig};
pub use mover::{FileMover, MoveError};
pub use rules::{Rule, RuleTable, RulesError};
pub use scanner::{FileOutcome, ScanReport, Scanner};
pub use state::{ProcessedSet, StateError, StateStore};

pub use cli::{Args, run};
