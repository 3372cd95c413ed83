//! The short-circuiting comparator chain deciding `same` vs `different`.

use std::io::{self, BufRead, BufReader, Read};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use fsview::{FilesystemView, RelPath};
use tracing::error;
use walk::Entry;

use crate::config::CompareMethod;
use crate::COPY_BUFFER_SIZE;

/// Whole seconds of tolerance for `moddate` comparison; FAT filesystems
/// store modification times with 2-second granularity.
pub const MODDATE_TOLERANCE_SECS: i64 = 2;

/// Evaluates the configured comparator chain for file pairs.
///
/// Two files are `same` iff every selected comparator agrees; the chain
/// stops at the first disagreement, so the expensive content comparators
/// only run when the cheap ones pass.
pub struct Comparator<'a> {
    methods: &'a [CompareMethod],
    source: &'a dyn FilesystemView,
    compare: &'a dyn FilesystemView,
}

impl<'a> Comparator<'a> {
    /// Creates a comparator reading the source side through `source` and
    /// the compare side through `compare`.
    #[must_use]
    pub fn new(
        methods: &'a [CompareMethod],
        source: &'a dyn FilesystemView,
        compare: &'a dyn FilesystemView,
    ) -> Self {
        Self {
            methods,
            source,
            compare,
        }
    }

    /// Compares the file at `relpath` on both sides.
    ///
    /// A read failure during content comparison is logged, counted in
    /// `errors`, and reported as `false`: scheduling a redundant copy is
    /// safe, skipping a changed file is not.
    #[must_use]
    pub fn files_equal(
        &self,
        relpath: &RelPath,
        source_entry: &Entry,
        compare_entry: &Entry,
        errors: &mut u64,
    ) -> bool {
        for method in self.methods {
            let equal = match method {
                CompareMethod::Moddate => {
                    moddate_equal(source_entry.mtime(), compare_entry.mtime())
                }
                CompareMethod::Size => source_entry.size() == compare_entry.size(),
                CompareMethod::Bytes => match self.bytes_equal(relpath) {
                    Ok(equal) => equal,
                    Err(error) => {
                        self.record_comparison_error(relpath, &error, errors);
                        false
                    }
                },
                CompareMethod::Hash => match self.digests_equal(relpath) {
                    Ok(equal) => equal,
                    Err(error) => {
                        self.record_comparison_error(relpath, &error, errors);
                        false
                    }
                },
            };
            if !equal {
                return false;
            }
        }
        true
    }

    fn record_comparison_error(&self, relpath: &RelPath, error: &io::Error, errors: &mut u64) {
        error!(
            path = %relpath,
            %error,
            "comparing files failed; assuming they differ"
        );
        *errors += 1;
    }

    fn bytes_equal(&self, relpath: &RelPath) -> io::Result<bool> {
        let source = self
            .source
            .open_read(relpath)
            .map_err(io::Error::other)?;
        let compare = self
            .compare
            .open_read(relpath)
            .map_err(io::Error::other)?;
        streams_equal(source, compare)
    }

    fn digests_equal(&self, relpath: &RelPath) -> io::Result<bool> {
        let source = self
            .source
            .open_read(relpath)
            .map_err(io::Error::other)?;
        let compare = self
            .compare
            .open_read(relpath)
            .map_err(io::Error::other)?;
        Ok(digest(source)? == digest(compare)?)
    }
}

/// Compares truncated whole-second timestamps with FAT tolerance.
///
/// A missing timestamp on either side reports `false`; the planner then
/// schedules a copy, which is the safe direction.
fn moddate_equal(a: Option<SystemTime>, b: Option<SystemTime>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (whole_seconds(a) - whole_seconds(b)).abs() <= MODDATE_TOLERANCE_SECS,
        _ => false,
    }
}

fn whole_seconds(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

/// Streams both readers and compares their contents.
fn streams_equal(a: impl Read, b: impl Read) -> io::Result<bool> {
    let mut a = BufReader::with_capacity(COPY_BUFFER_SIZE, a);
    let mut b = BufReader::with_capacity(COPY_BUFFER_SIZE, b);
    loop {
        let buf_a = a.fill_buf()?;
        let buf_b = b.fill_buf()?;
        if buf_a.is_empty() || buf_b.is_empty() {
            return Ok(buf_a.is_empty() && buf_b.is_empty());
        }
        let len = buf_a.len().min(buf_b.len());
        if buf_a[..len] != buf_b[..len] {
            return Ok(false);
        }
        a.consume(len);
        b.consume(len);
    }
}

fn digest(mut reader: impl Read) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize())
}

/// Rejects comparison chains that cannot decide against a view without
/// modification times.
///
/// `moddate` against such a view always reports `different`; that is only
/// acceptable when a content comparator follows to give a positive answer.
///
/// # Errors
///
/// Returns a description of the offending chain.
pub fn validate_methods(
    methods: &[CompareMethod],
    source_provides_mtime: bool,
) -> Result<(), String> {
    if source_provides_mtime {
        return Ok(());
    }
    if let Some(position) = methods
        .iter()
        .position(|method| *method == CompareMethod::Moddate)
    {
        let has_content_check = methods[position + 1..]
            .iter()
            .any(|method| matches!(method, CompareMethod::Bytes | CompareMethod::Hash));
        if !has_content_check {
            return Err(
                "the source does not report modification times; \
                 'moddate' must be followed by 'bytes' or 'hash'"
                    .to_string(),
            );
        }
    }
    Ok(())
}
