#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `filters` provides ordered exclusion-pattern evaluation for the Frontdown
//! workspace. Each backup source carries a list of glob patterns that are
//! matched against the relative path of every entry encountered during a
//! scan. A path that matches any pattern is excluded; when the excluded entry
//! is a directory, the scanner skips its entire subtree.
//!
//! # Design
//!
//! - [`ExcludeSet`] owns the compiled representation of each pattern. Heavy
//!   lifting happens once at construction; matching is a linear probe over
//!   the compiled matchers.
//! - A trailing `/` marks a directory-only pattern: it can only exclude
//!   directories, never files.
//! - Patterns use fnmatch-style globbing: `*` and `?` match across path
//!   separators, so `build/*` and `*.tmp` behave the way the configuration
//!   format documents them.
//! - Matching occurs against relative paths using native [`Path`] semantics
//!   so callers can operate directly on `std::path::Path` values.
//!
//! # Invariants
//!
//! - Patterns are evaluated in definition order; the first match excludes.
//! - Matching is case-insensitive on platforms whose filesystems are
//!   case-insensitive (Windows, macOS) and case-sensitive elsewhere, unless
//!   overridden with [`ExcludeSetBuilder::case_insensitive`].
//! - A pattern without a trailing `/` excludes files and directories alike.
//!
//! # Errors
//!
//! [`ExcludeSet::new`] reports [`PatternError`] when a pattern cannot be
//! compiled. The error carries the offending pattern text and the underlying
//! [`globset::Error`].

use std::fmt;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

/// Error produced when an exclusion pattern cannot be compiled.
#[derive(Debug)]
pub struct PatternError {
    pattern: String,
    source: globset::Error,
}

impl PatternError {
    fn new(pattern: String, source: globset::Error) -> Self {
        Self { pattern, source }
    }

    /// Returns the offending pattern text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to compile exclusion pattern '{}': {}",
            self.pattern, self.source
        )
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug)]
struct CompiledPattern {
    text: String,
    dir_only: bool,
    matcher: GlobMatcher,
}

/// Configures and builds an [`ExcludeSet`].
#[derive(Debug)]
pub struct ExcludeSetBuilder {
    patterns: Vec<String>,
    case_insensitive: bool,
}

impl ExcludeSetBuilder {
    /// Starts a builder over the given pattern list.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            case_insensitive: default_case_insensitive(),
        }
    }

    /// Overrides the platform default for case sensitivity.
    #[must_use]
    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.case_insensitive = value;
        self
    }

    /// Compiles the patterns into an [`ExcludeSet`].
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for the first pattern that fails to compile.
    pub fn build(self) -> Result<ExcludeSet, PatternError> {
        let mut compiled = Vec::with_capacity(self.patterns.len());
        for text in self.patterns {
            let (stripped, dir_only) = match text.strip_suffix('/') {
                Some(stripped) if !stripped.is_empty() => (stripped, true),
                _ => (text.as_str(), false),
            };
            let glob = GlobBuilder::new(stripped)
                .literal_separator(false)
                .case_insensitive(self.case_insensitive)
                .build()
                .map_err(|source| PatternError::new(text.clone(), source))?;
            compiled.push(CompiledPattern {
                text,
                dir_only,
                matcher: glob.compile_matcher(),
            });
        }
        Ok(ExcludeSet { patterns: compiled })
    }
}

/// Compiled set of exclusion patterns for one scan.
#[derive(Debug)]
pub struct ExcludeSet {
    patterns: Vec<CompiledPattern>,
}

impl ExcludeSet {
    /// Compiles `patterns` with the platform-default case rule.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for the first pattern that fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExcludeSetBuilder::new(patterns).build()
    }

    /// Returns an empty set that excludes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Reports whether the set contains no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Reports whether `relpath` is excluded.
    ///
    /// `is_dir` selects whether directory-only patterns (trailing `/`)
    /// participate in the match.
    #[must_use]
    pub fn is_excluded(&self, relpath: &Path, is_dir: bool) -> bool {
        self.patterns
            .iter()
            .any(|pattern| (is_dir || !pattern.dir_only) && pattern.matcher.is_match(relpath))
    }

    /// Returns the original pattern texts, in definition order.
    pub fn pattern_texts(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|pattern| pattern.text.as_str())
    }
}

/// Platform default: case-insensitive matching where the filesystem is.
#[must_use]
fn default_case_insensitive() -> bool {
    cfg!(any(windows, target_os = "macos"))
}
