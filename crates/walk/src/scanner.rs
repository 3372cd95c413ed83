use std::path::PathBuf;

use filters::ExcludeSet;
use fsview::{DirEntryInfo, FilesystemView, RelPath};
use tracing::{error, warn};

use crate::entry::Entry;

/// Deterministic pre-order iterator over the surviving entries of a tree.
///
/// Exclusion patterns are applied to every encountered entry; an excluded
/// directory is not descended into. Listing failures are counted as scan
/// errors, the affected subtree is skipped, and iteration continues with
/// the siblings. When the cumulative error count exceeds the configured
/// budget the scanner stops and [`Scanner::budget_exhausted`] reports the
/// fatal condition to the caller.
pub struct Scanner<'a> {
    view: &'a dyn FilesystemView,
    excludes: &'a ExcludeSet,
    stack: Vec<DirState>,
    errors: u64,
    initial_errors: u64,
    max_errors: Option<u64>,
    budget_exhausted: bool,
    started: bool,
}

struct DirState {
    relpath: RelPath,
    children: Vec<DirEntryInfo>,
    index: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over `view` filtered by `excludes`.
    #[must_use]
    pub fn new(view: &'a dyn FilesystemView, excludes: &'a ExcludeSet) -> Self {
        Self {
            view,
            excludes,
            stack: Vec::new(),
            errors: 0,
            initial_errors: 0,
            max_errors: None,
            budget_exhausted: false,
            started: false,
        }
    }

    /// Applies an error budget shared across scans.
    ///
    /// `initial` carries errors already accumulated by earlier scans of the
    /// same job; `max` is the configured maximum (`None` disables the
    /// check). The scan turns fatal once `initial + own errors` exceeds
    /// `max`.
    #[must_use]
    pub fn with_error_budget(mut self, initial: u64, max: Option<u64>) -> Self {
        self.initial_errors = initial;
        self.max_errors = max;
        self
    }

    /// Number of scan errors recorded by this scanner.
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Reports whether the error budget was exhausted mid-scan.
    ///
    /// A `true` value means the emitted entry sequence is incomplete and
    /// the job must treat the scan as failed.
    #[must_use]
    pub fn budget_exhausted(&self) -> bool {
        self.budget_exhausted
    }

    fn record_error(&mut self, path: PathBuf, error: &fsview::FsError) {
        error!(path = %path.display(), %error, "scan error, skipping subtree");
        self.errors += 1;
        self.check_budget();
    }

    fn check_budget(&mut self) {
        if let Some(max) = self.max_errors {
            if self.initial_errors + self.errors > max {
                error!(
                    errors = self.initial_errors + self.errors,
                    permitted = max,
                    "too many scan errors, aborting scan"
                );
                self.budget_exhausted = true;
            }
        }
    }

    /// Lists `relpath`, folds listing errors into the budget, and returns
    /// the children that survive exclusion.
    fn list_surviving(&mut self, relpath: &RelPath) -> Option<Vec<DirEntryInfo>> {
        let listing = match self.view.list(relpath) {
            Ok(listing) => listing,
            Err(fs_error) => {
                self.record_error(self.view.full_path(relpath), &fs_error);
                return None;
            }
        };
        if listing.errors > 0 {
            self.errors += listing.errors;
            self.check_budget();
        }
        let excludes = self.excludes;
        let surviving = listing
            .entries
            .into_iter()
            .filter(|child| {
                let child_rel = relpath.join(&child.name);
                !excludes.is_excluded(child_rel.as_path(), child.kind.is_dir())
            })
            .collect();
        Some(surviving)
    }

    fn start(&mut self) {
        self.started = true;
        if let Some(children) = self.list_surviving(&RelPath::root()) {
            self.stack.push(DirState {
                relpath: RelPath::root(),
                children,
                index: 0,
            });
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.start();
        }

        loop {
            if self.budget_exhausted {
                return None;
            }

            let (child, parent_rel) = {
                let state = self.stack.last_mut()?;
                match state.children.get(state.index) {
                    Some(child) => {
                        state.index += 1;
                        (child.clone(), state.relpath.clone())
                    }
                    None => {
                        self.stack.pop();
                        continue;
                    }
                }
            };

            let relpath = parent_rel.join(&child.name);
            if !child.kind.is_dir() {
                return Some(Entry::file(relpath, child.size, child.mtime));
            }

            if child.is_symlink {
                // junctions and directory symlinks are reported, not followed
                warn!(
                    path = %self.view.full_path(&relpath).display(),
                    "directory link not followed, reported as empty directory"
                );
                return Some(Entry::directory(relpath, child.mtime, true));
            }

            match self.list_surviving(&relpath) {
                Some(children) => {
                    let entry = Entry::directory(relpath.clone(), child.mtime, children.is_empty());
                    self.stack.push(DirState {
                        relpath,
                        children,
                        index: 0,
                    });
                    return Some(entry);
                }
                None => continue,
            }
        }
    }
}
