//! Ordered glob rules deciding where a file goes.
//!
//! Rules are read from a plain text file, one per line:
//!
//! ```text
//! # invoices first, everything else PDF afterwards
//! invoice_*.pdf | /archive/invoices
//! *.pdf         | /archive/pdf
//! ```
//!
//! Order is precedence: the first rule whose pattern matches a file's base
//! name wins, regardless of how specific later rules are.
//!
//! # Examples
//!
//! ```
//! use mvgo::rules::RuleTable;
//!
//! let table = RuleTable::parse("*.txt | /notes\nreport.txt | /reports\n");
//! let rule = table.first_match("report.txt").unwrap();
//! assert_eq!(rule.destination.to_str(), Some("/notes"));
//! ```

use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rules file used when none is given on the command line.
pub const DEFAULT_RULES_FILE: &str = "mvGo.rules";

const COMMENT_MARKER: char = '#';
const FIELD_DELIMITER: char = '|';

/// Errors raised while reading the rules source.
///
/// Individual malformed lines are never an error; they are skipped.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("rules file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read rules {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// A single `pattern | destination` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Shell-style glob applied to a file's base name.
    pub pattern: String,
    /// Directory the matching file is moved into.
    pub destination: PathBuf,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            destination: destination.into(),
        }
    }
}

/// A rule paired with its compiled pattern.
///
/// `compiled` is `None` when the glob is malformed; such a rule keeps its
/// position in the table but never matches.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    compiled: Option<Pattern>,
}

impl CompiledRule {
    fn new(rule: Rule) -> Self {
        let compiled = match Pattern::new(&rule.pattern) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(
                    pattern = %rule.pattern,
                    error = %e,
                    "Invalid glob pattern, rule will never match"
                );
                None
            }
        };
        Self { rule, compiled }
    }

    fn matches(&self, file_name: &str) -> bool {
        match &self.compiled {
            Some(pattern) => pattern.matches(file_name),
            None => {
                tracing::trace!(pattern = %self.rule.pattern, "Skipping malformed pattern");
                false
            }
        }
    }
}

/// The ordered rule set, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

impl RuleTable {
    /// Reads and parses the rules file at `path`.
    ///
    /// # Errors
    ///
    /// Only a failure to read the file itself is reported.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RulesError::NotFound(path.to_path_buf())
            } else {
                RulesError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Ok(Self::parse(&content))
    }

    /// Parses rule text.
    ///
    /// Blank lines and lines starting with `#` are skipped. Every other line
    /// is split on its first `|`; lines without one are discarded silently.
    pub fn parse(content: &str) -> Self {
        let rules = content
            .lines()
            .filter_map(parse_line)
            .map(CompiledRule::new)
            .collect();
        Self { rules }
    }

    /// Returns the first rule whose pattern matches `file_name`.
    pub fn first_match(&self, file_name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|candidate| candidate.matches(file_name))
            .map(|candidate| &candidate.rule)
    }

    /// Like [`first_match`](Self::first_match) but takes a full path and only
    /// looks at its base name.
    pub fn match_path(&self, path: &Path) -> Option<&Rule> {
        let file_name = path.file_name()?.to_string_lossy();
        self.first_match(&file_name)
    }

    /// Rules in precedence order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|candidate| &candidate.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for RuleTable {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().map(CompiledRule::new).collect(),
        }
    }
}

fn parse_line(line: &str) -> Option<Rule> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_MARKER) {
        return None;
    }

    let (pattern, destination) = line.split_once(FIELD_DELIMITER)?;
    Some(Rule::new(pattern.trim(), destination.trim()))
}
