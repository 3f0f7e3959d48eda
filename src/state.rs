/// Durable record of files that have already been moved.
///
/// The store is a small JSON document mapping every processed path to an
/// empty object:
///
/// ```json
/// {
///   "processed": {
///     "/watch/a.csv": {}
///   }
/// }
/// ```
///
/// Loading never fails: a missing or corrupt store starts an empty set.
/// Saving writes a sibling temporary file and renames it over the store.
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while persisting the processed set.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to serialize processed set: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write state file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// The set of path keys already moved.
///
/// Keys are the path strings observed during the scan. The set only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    keys: BTreeSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Records `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Marker value stored for each key; serializes as `{}`.
#[derive(Serialize)]
struct Processed {}

#[derive(Serialize)]
struct StateFileOut<'a> {
    processed: BTreeMap<&'a str, Processed>,
}

/// Marker values are not inspected on load, so `{}`, `null` or anything
/// else written by hand is accepted.
#[derive(Deserialize)]
struct StateFileIn {
    #[serde(default)]
    processed: Option<BTreeMap<String, IgnoredAny>>,
}

/// Reads and writes the processed set at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted set, or an empty one if the store is missing or
    /// unreadable.
    pub fn load(&self) -> ProcessedSet {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state file yet, starting empty");
                return ProcessedSet::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not read state file, starting empty");
                return ProcessedSet::new();
            }
        };

        match serde_json::from_str::<StateFileIn>(&content) {
            Ok(state) => state
                .processed
                .unwrap_or_default()
                .into_keys()
                .collect(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "State file is corrupt, starting empty");
                ProcessedSet::new()
            }
        }
    }

    /// Serializes `set` pretty-printed and atomically replaces the store.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Write` if the temporary file cannot be created,
    /// written, or renamed into place.
    pub fn save(&self, set: &ProcessedSet) -> Result<(), StateError> {
        let document = StateFileOut {
            processed: set.iter().map(|key| (key, Processed {})).collect(),
        };
        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');

        self.replace_contents(json.as_bytes())
            .map_err(|source| StateError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn replace_contents(&self, contents: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("mvGo.state.json"));
        let set: ProcessedSet = ["/watch/a.csv", "/watch/sub/b.pdf", "relative/c.txt"]
            .into_iter()
            .collect();

        store.save(&set).unwrap();
        let loaded = store.load();

        assert_eq!(loaded, set);
    }

    #[test]
    fn test_saved_format_is_pretty_mapping_to_empty_objects() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let set: ProcessedSet = ["/w/b", "/w/a"].into_iter().collect();

        store.save(&set).unwrap();
        let content = fs::read_to_string(store.path()).unwrap();

        let expected = "{\n  \"processed\": {\n    \"/w/a\": {},\n    \"/w/b\": {}\n  }\n}\n";
        assert_eq!(content, expected);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{\"processed\": {\"/w/a\": {},").unwrap();

        assert!(StateStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_load_accepts_null_markers_and_missing_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        fs::write(&path, r#"{"processed": {"/w/a": null, "/w/b": {}}}"#).unwrap();
        let loaded = StateStore::new(&path).load();
        assert!(loaded.contains("/w/a"));
        assert!(loaded.contains("/w/b"));

        fs::write(&path, "{}").unwrap();
        assert!(StateStore::new(&path).load().is_empty());

        fs::write(&path, r#"{"processed": null}"#).unwrap();
        assert!(StateStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_overwrites_previous_store() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut set = ProcessedSet::new();
        set.insert("/w/a");
        store.save(&set).unwrap();
        set.insert("/w/b");
        store.save(&set).unwrap();

        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("missing").join("state.json"));

        let result = store.save(&ProcessedSet::new());
        assert!(matches!(result, Err(StateError::Write { .. })));
    }

    #[test]
    fn test_insert_reports_new_keys() {
        let mut set = ProcessedSet::new();
        assert!(set.insert("/w/a"));
        assert!(!set.insert("/w/a"));
        assert_eq!(set.len(), 1);
    }
}
