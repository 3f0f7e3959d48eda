//! The polling loop.
//!
//! A [`Scanner`] owns everything a scan needs: the configuration, the rule
//! table, the state store and the in-memory processed set. One scan walks the
//! whole watch tree sequentially; [`Scanner::run`] alternates scans with an
//! interruptible sleep until it is told to stop.

use crate::config::Config;
use crate::mover::FileMover;
use crate::rules::RuleTable;
use crate::state::{ProcessedSet, StateStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use walkdir::WalkDir;

/// What happened to a single file during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Moved to the destination of a matching rule and recorded.
    Moved { destination: PathBuf },
    /// Already processed; relocated to the duplicate directory.
    DuplicateRelocated { destination: PathBuf },
    /// Already processed; left in place (no duplicate directory, or the
    /// relocation failed).
    DuplicateLeft,
    /// No rule matched.
    Unmatched,
    /// A rule matched but the move failed; retried on the next scan.
    Failed,
}

/// Counters for one pass over the watch tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub moved: usize,
    pub duplicates_relocated: usize,
    pub duplicates_left: usize,
    pub unmatched: usize,
    pub failed: usize,
    /// Walk entries that could not be read.
    pub skipped_entries: usize,
}

impl ScanReport {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Moved { .. } => self.moved += 1,
            FileOutcome::DuplicateRelocated { .. } => self.duplicates_relocated += 1,
            FileOutcome::DuplicateLeft => self.duplicates_left += 1,
            FileOutcome::Unmatched => self.unmatched += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of files looked at.
    pub fn files_seen(&self) -> usize {
        self.moved + self.duplicates_relocated + self.duplicates_left + self.unmatched + self.failed
    }
}

/// Application context for the scan loop.
pub struct Scanner {
    config: Config,
    rules: RuleTable,
    store: StateStore,
    processed: ProcessedSet,
    /// Canonical paths of the state and log files, never treated as input.
    own_files: Vec<PathBuf>,
}

impl Scanner {
    /// Builds a scanner and loads the processed set from the configured
    /// state file.
    pub fn new(config: Config, rules: RuleTable) -> Self {
        let store = StateStore::new(&config.state_file);
        let processed = store.load();
        tracing::debug!(
            entries = processed.len(),
            path = %store.path().display(),
            "Loaded processed set"
        );

        Self {
            config,
            rules,
            store,
            processed,
            own_files: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Scans, then sleeps for the poll interval, until `shutdown` receives a
    /// message or its sender is dropped. The processed set is persisted once
    /// more before returning.
    pub fn run(&mut self, shutdown: &Receiver<()>) {
        tracing::info!(watch_dir = %self.config.watch_dir.display(), "Starting watcher");
        let interval = self.config.poll_interval();

        loop {
            let report = self.scan_once();
            tracing::debug!(?report, "Scan complete");

            match shutdown.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::info!("Shutting down");
        self.persist();
    }

    /// Walks the watch tree once and handles every file found.
    pub fn scan_once(&mut self) -> ScanReport {
        self.refresh_own_files();
        let mut report = ScanReport::default();

        for entry in WalkDir::new(&self.config.watch_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable entry");
                    report.skipped_entries += 1;
                    continue;
                }
            };

            if entry.file_type().is_dir() || self.is_own_file(entry.path()) {
                continue;
            }

            let outcome = self.process_file(entry.path());
            report.record(&outcome);
        }

        report
    }

    /// Applies the duplicate check or the rule table to one file.
    pub fn process_file(&mut self, path: &Path) -> FileOutcome {
        let key = path.to_string_lossy().into_owned();
        let base = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.clone());

        if self.processed.contains(&key) {
            return self.handle_duplicate(path, &base);
        }

        let Some(rule) = self.rules.first_match(&base) else {
            tracing::info!(file = %base, "File found but no matching rule");
            return FileOutcome::Unmatched;
        };

        tracing::info!(file = %base, destination = %rule.destination.display(), "Moving file");
        match FileMover::move_into(path, &rule.destination) {
            Ok(destination) => {
                self.processed.insert(key);
                self.persist();
                // The first save may have just created the store.
                self.refresh_own_files();
                FileOutcome::Moved { destination }
            }
            Err(e) => {
                tracing::error!(file = %base, error = %e, "Error moving file");
                FileOutcome::Failed
            }
        }
    }

    fn handle_duplicate(&self, path: &Path, base: &str) -> FileOutcome {
        let Some(duplicate_dir) = &self.config.duplicate_dir else {
            tracing::info!(file = %base, "File already processed, no duplicate destination configured");
            return FileOutcome::DuplicateLeft;
        };

        tracing::info!(
            file = %base,
            destination = %duplicate_dir.join(base).display(),
            "File already processed, moving to duplicate destination"
        );
        match FileMover::move_into(path, duplicate_dir) {
            Ok(destination) => FileOutcome::DuplicateRelocated { destination },
            Err(e) => {
                tracing::error!(file = %base, error = %e, "Error moving duplicate file");
                FileOutcome::DuplicateLeft
            }
        }
    }

    /// Best-effort save of the processed set.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.processed) {
            tracing::error!(error = %e, "Could not save state");
        }
    }

    fn refresh_own_files(&mut self) {
        self.own_files = [&self.config.state_file, &self.config.log_file]
            .into_iter()
            .filter_map(|path| resolve_location(path))
            .collect();
    }

    fn is_own_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        // Only resolve when the name could be one of ours.
        if !self.own_files.iter().any(|own| own.file_name() == Some(name)) {
            return false;
        }
        resolve_location(path).is_some_and(|resolved| self.own_files.contains(&resolved))
    }
}

/// Canonical parent joined with the file name, so a file that does not
/// exist yet resolves to the same path it will have once created.
fn resolve_location(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match fs::canonicalize(parent) {
        Ok(parent) => Some(parent.join(name)),
        Err(_) => std::path::absolute(path).ok(),
    }
}
