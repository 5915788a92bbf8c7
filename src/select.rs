//! Glob-based source selection.
//!
//! A selector owns a root directory plus include and exclude patterns
//! relative to it. Selection is deterministic: matches are sorted by
//! relative path before a chain ever sees them.

use crate::transform::SourceFile;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Selection error.
#[derive(Debug, Error)]
pub enum SelectError {
    /// An include or exclude pattern failed to parse
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// Parse failure
        source: glob::PatternError,
    },
    /// A matched file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// The unreadable file
        path: PathBuf,
        /// I/O failure
        source: std::io::Error,
    },
}

/// Matches files under a root directory.
#[derive(Debug, Clone)]
pub struct FileSelector {
    /// Directory patterns are resolved against
    pub root: PathBuf,
    /// Include patterns, relative to the root
    pub includes: Vec<String>,
    /// Exclude patterns, relative to the root
    pub excludes: Vec<String>,
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    }
}

impl FileSelector {
    /// Selector with include patterns and no excludes.
    pub fn new<I, S>(root: impl Into<PathBuf>, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            includes: includes.into_iter().map(Into::into).collect(),
            excludes: Vec::new(),
        }
    }

    /// Add exclude patterns.
    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    /// Collect and read every matching file.
    ///
    /// A missing root yields an empty set: optional source folders (the
    /// sprite and favicon subdirs) simply contribute nothing.
    pub fn select(&self) -> Result<Vec<SourceFile>, SelectError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let excludes = self.compile(&self.excludes)?;
        let mut rels: Vec<PathBuf> = Vec::new();

        for pattern in &self.includes {
            let full = self.root.join(pattern);
            let full = full.to_string_lossy().into_owned();
            let paths = glob::glob_with(&full, match_options()).map_err(|source| {
                SelectError::Pattern { pattern: pattern.clone(), source }
            })?;
            for entry in paths.flatten() {
                if !entry.is_file() {
                    continue;
                }
                let rel = match entry.strip_prefix(&self.root) {
                    Ok(rel) => rel.to_path_buf(),
                    Err(_) => continue,
                };
                if excludes.iter().any(|p| p.matches_path_with(&rel, match_options())) {
                    continue;
                }
                if !rels.contains(&rel) {
                    rels.push(rel);
                }
            }
        }

        rels.sort();
        let mut files = Vec::with_capacity(rels.len());
        for rel in rels {
            let path = self.root.join(&rel);
            let bytes = std::fs::read(&path)
                .map_err(|source| SelectError::Read { path: path.clone(), source })?;
            files.push(SourceFile::new(rel, bytes));
        }
        Ok(files)
    }

    /// Whether an absolute path falls inside this selector.
    pub fn matches(&self, path: &Path) -> bool {
        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => return false,
        };
        let includes = match self.compile(&self.includes) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let excludes = match self.compile(&self.excludes) {
            Ok(p) => p,
            Err(_) => return false,
        };
        includes.iter().any(|p| p.matches_path_with(rel, match_options()))
            && !excludes.iter().any(|p| p.matches_path_with(rel, match_options()))
    }

    fn compile(&self, patterns: &[String]) -> Result<Vec<Pattern>, SelectError> {
        patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| SelectError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect()
    }
}
