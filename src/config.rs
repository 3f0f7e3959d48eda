//! Runtime configuration for the watcher.
//!
//! The configuration is read once at start-up and never changes afterwards.
//! JSON is the native format; a file with a `.toml` extension is parsed as
//! TOML using the same field names.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!   "watch_dir": "/home/user/Downloads",
//!   "poll_interval": 5,
//!   "state_file": "mvGo.state.json",
//!   "log_file": "mvGo.log",
//!   "duplicate_dir": "/home/user/Downloads/duplicates",
//!   "syslog": { "enabled": false, "network": "udp", "address": "localhost:514" }
//! }
//! ```
//!
//! Only `watch_dir` is required. Missing, empty or non-positive values are
//! replaced by the defaults below during [`Config::load`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "mvGo.json";
/// Seconds between two scans when `poll_interval` is absent or not positive.
pub const DEFAULT_POLL_INTERVAL: i64 = 5;
pub const DEFAULT_STATE_FILE: &str = "mvGo.state.json";
pub const DEFAULT_LOG_FILE: &str = "mvGo.log";
pub const DEFAULT_SYSLOG_NETWORK: &str = "udp";

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file exists but could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    /// Invalid JSON/TOML syntax or structure.
    #[error("invalid configuration {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    /// `watch_dir` was present but empty.
    #[error("invalid configuration: watch_dir must not be empty")]
    EmptyWatchDir,
}

/// Remote syslog relay settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyslogConfig {
    #[serde(default)]
    pub enabled: bool,
    /// One of `udp`, `tcp`, or on Unix `unix` / `unixgram`.
    #[serde(default)]
    pub network: String,
    /// `host:port` for network transports, a socket path for Unix ones.
    #[serde(default)]
    pub address: String,
}

/// Watcher configuration, normalized at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the tree scanned on every poll.
    pub watch_dir: PathBuf,

    /// Seconds to sleep between scans.
    #[serde(default)]
    pub poll_interval: i64,

    /// Where the processed set is persisted.
    #[serde(default)]
    pub state_file: PathBuf,

    /// Append-mode log file.
    #[serde(default)]
    pub log_file: PathBuf,

    /// Destination for files reappearing at an already processed path.
    #[serde(default)]
    pub duplicate_dir: Option<PathBuf>,

    #[serde(default)]
    pub syslog: SyslogConfig,
}

impl Config {
    /// Creates a configuration for `watch_dir` with every other field defaulted.
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            poll_interval: 0,
            state_file: PathBuf::new(),
            log_file: PathBuf::new(),
            duplicate_dir: None,
            syslog: SyslogConfig::default(),
        }
        .normalized()
    }

    /// Load and normalize the configuration stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Io` if it cannot be read, and `ConfigError::Invalid` if
    /// it does not parse or lacks `watch_dir`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content, Format::for_path(path)).map_err(|reason| {
            ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        config.validate()
    }

    fn parse(content: &str, format: Format) -> Result<Self, String> {
        let config: Self = match format {
            Format::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
            Format::Toml => toml::from_str(content).map_err(|e| e.to_string())?,
        };
        Ok(config.normalized())
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.watch_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyWatchDir);
        }
        Ok(self)
    }

    /// Replaces missing or out-of-range values with their defaults.
    fn normalized(mut self) -> Self {
        if self.poll_interval <= 0 {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.state_file.as_os_str().is_empty() {
            self.state_file = PathBuf::from(DEFAULT_STATE_FILE);
        }
        if self.log_file.as_os_str().is_empty() {
            self.log_file = PathBuf::from(DEFAULT_LOG_FILE);
        }
        if self
            .duplicate_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            self.duplicate_dir = None;
        }
        if self.syslog.network.is_empty() {
            self.syslog.network = DEFAULT_SYSLOG_NETWORK.to_string();
        }
        self
    }

    /// Sleep between two scans.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(1).unsigned_abs())
    }
}

/// On-disk syntax of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("Failed to write config");
        path
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::parse(r#"{"watch_dir": "/srv/inbox"}"#, Format::Json).unwrap();

        assert_eq!(config.watch_dir, PathBuf::from("/srv/inbox"));
        assert_eq!(config.poll_interval, 5);
        assert_eq!(config.state_file, PathBuf::from("mvGo.state.json"));
        assert_eq!(config.log_file, PathBuf::from("mvGo.log"));
        assert_eq!(config.duplicate_dir, None);
        assert!(!config.syslog.enabled);
        assert_eq!(config.syslog.network, "udp");
    }

    #[test]
    fn test_zero_poll_interval_normalized() {
        let config =
            Config::parse(r#"{"watch_dir": "/in", "poll_interval": 0}"#, Format::Json).unwrap();
        assert_eq!(config.poll_interval, 5);
    }

    #[test]
    fn test_negative_poll_interval_normalized() {
        let config =
            Config::parse(r#"{"watch_dir": "/in", "poll_interval": -12}"#, Format::Json).unwrap();
        assert_eq!(config.poll_interval, 5);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_positive_poll_interval_kept() {
        let config =
            Config::parse(r#"{"watch_dir": "/in", "poll_interval": 30}"#, Format::Json).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_strings_fall_back_to_defaults() {
        let config = Config::parse(
            r#"{
                "watch_dir": "/in",
                "state_file": "",
                "log_file": "",
                "duplicate_dir": "",
                "syslog": {"enabled": true, "network": "", "address": "logs:514"}
            }"#,
            Format::Json,
        )
        .unwrap();

        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.duplicate_dir, None);
        assert_eq!(config.syslog.network, "udp");
        assert_eq!(config.syslog.address, "logs:514");
    }

    #[test]
    fn test_missing_watch_dir_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "mvGo.json", r#"{"poll_interval": 3}"#);

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_empty_watch_dir_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "mvGo.json", r#"{"watch_dir": ""}"#);

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::EmptyWatchDir)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = Config::load(Path::new("/definitely/not/here/mvGo.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_json_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "mvGo.json", "{ watch_dir: ");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_load_toml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "mvGo.toml",
            r#"
watch_dir = "/in"
poll_interval = 12
duplicate_dir = "/dup"

[syslog]
enabled = true
network = "tcp"
address = "127.0.0.1:601"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.poll_interval, 12);
        assert_eq!(config.duplicate_dir, Some(PathBuf::from("/dup")));
        assert_eq!(config.syslog.network, "tcp");
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("/in");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
    }
}
