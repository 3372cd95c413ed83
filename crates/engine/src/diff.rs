//! Merge join of the source and compare scan streams.

use fsview::RelPath;
use walk::Entry;

use crate::compare::Comparator;

/// Comparison verdict for a path present on both sides as a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Every selected comparator reported equality.
    Same,
    /// At least one comparator disagreed (or comparison failed).
    Different,
}

/// One relative path with its presence on either side.
///
/// At least one of the two sides is populated. When both sides are files a
/// [`Verdict`] is attached; it is computed once, here, so the planner never
/// re-reads file contents.
#[derive(Debug)]
pub struct PairedEntry {
    relpath: RelPath,
    source: Option<Entry>,
    compare: Option<Entry>,
    verdict: Option<Verdict>,
}

impl PairedEntry {
    fn source_only(entry: Entry) -> Self {
        Self {
            relpath: entry.relpath().clone(),
            source: Some(entry),
            compare: None,
            verdict: None,
        }
    }

    fn compare_only(entry: Entry) -> Self {
        Self {
            relpath: entry.relpath().clone(),
            source: None,
            compare: Some(entry),
            verdict: None,
        }
    }

    fn both(source: Entry, compare: Entry, verdict: Option<Verdict>) -> Self {
        Self {
            relpath: source.relpath().clone(),
            source: Some(source),
            compare: Some(compare),
            verdict,
        }
    }

    /// Returns the shared relative path.
    #[must_use]
    pub fn relpath(&self) -> &RelPath {
        &self.relpath
    }

    /// Returns the source-side entry, when present.
    #[must_use]
    pub fn source(&self) -> Option<&Entry> {
        self.source.as_ref()
    }

    /// Returns the compare-side entry, when present.
    #[must_use]
    pub fn compare(&self) -> Option<&Entry> {
        self.compare.as_ref()
    }

    /// Returns the comparison verdict for file/file pairs.
    #[must_use]
    pub const fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }
}

/// Merges the two sorted scan streams into a single ordered pairing.
///
/// The output preserves the source scan order with compare-only entries
/// inserted at their sorted position. When the two sides disagree on the
/// kind of a path, the pair is split into an independent source-only and
/// compare-only entry, so the planner emits a deletion and a creation.
///
/// `comparator` computes verdicts for file/file pairs; comparison read
/// failures are added to `scan_errors`.
#[must_use]
pub fn pair_entries(
    source: Vec<Entry>,
    compare: Vec<Entry>,
    comparator: Option<&Comparator<'_>>,
    scan_errors: &mut u64,
) -> Vec<PairedEntry> {
    use std::cmp::Ordering;

    let mut paired = Vec::with_capacity(source.len().max(compare.len()));
    let mut source_iter = source.into_iter().peekable();
    let mut compare_iter = compare.into_iter().peekable();

    loop {
        let ordering = match (source_iter.peek(), compare_iter.peek()) {
            (Some(s), Some(c)) => s.relpath().cmp(c.relpath()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match ordering {
            Ordering::Less => {
                if let Some(entry) = source_iter.next() {
                    paired.push(PairedEntry::source_only(entry));
                }
            }
            Ordering::Greater => {
                if let Some(entry) = compare_iter.next() {
                    paired.push(PairedEntry::compare_only(entry));
                }
            }
            Ordering::Equal => {
                let (Some(source_entry), Some(compare_entry)) =
                    (source_iter.next(), compare_iter.next())
                else {
                    break;
                };
                if source_entry.kind() != compare_entry.kind() {
                    paired.push(PairedEntry::source_only(source_entry));
                    paired.push(PairedEntry::compare_only(compare_entry));
                    continue;
                }
                let verdict = if source_entry.is_dir() {
                    None
                } else {
                    comparator.map(|comparator| {
                        if comparator.files_equal(
                            source_entry.relpath(),
                            &source_entry,
                            &compare_entry,
                            scan_errors,
                        ) {
                            Verdict::Same
                        } else {
                            Verdict::Different
                        }
                    })
                };
                paired.push(PairedEntry::both(source_entry, compare_entry, verdict));
            }
        }
    }
    paired
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use filters::ExcludeSet;
    use fsview::LocalView;
    use walk::Scanner;

    fn scan_dir(dir: &std::path::Path) -> Vec<Entry> {
        let view = LocalView::new(dir);
        let excludes = ExcludeSet::empty();
        Scanner::new(&view, &excludes).collect()
    }

    #[test]
    fn disjoint_streams_interleave_in_path_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let left = temp.path().join("left");
        let right = temp.path().join("right");
        fs::create_dir(&left).expect("mkdir");
        fs::create_dir(&right).expect("mkdir");
        fs::write(left.join("a"), b"").expect("write");
        fs::write(left.join("c"), b"").expect("write");
        fs::write(right.join("b"), b"").expect("write");
        fs::write(right.join("d"), b"").expect("write");

        let mut errors = 0;
        let paired = pair_entries(scan_dir(&left), scan_dir(&right), None, &mut errors);
        let order: Vec<String> = paired
            .iter()
            .map(|pair| pair.relpath().to_slash_string())
            .collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert!(paired[0].source().is_some() && paired[0].compare().is_none());
        assert!(paired[1].source().is_none() && paired[1].compare().is_some());
    }

    #[test]
    fn shared_paths_are_paired() {
        let temp = tempfile::tempdir().expect("tempdir");
        let left = temp.path().join("left");
        let right = temp.path().join("right");
        fs::create_dir(&left).expect("mkdir");
        fs::create_dir(&right).expect("mkdir");
        fs::write(left.join("shared"), b"x").expect("write");
        fs::write(right.join("shared"), b"x").expect("write");

        let mut errors = 0;
        let paired = pair_entries(scan_dir(&left), scan_dir(&right), None, &mut errors);
        assert_eq!(paired.len(), 1);
        assert!(paired[0].source().is_some());
        assert!(paired[0].compare().is_some());
        // without a comparator no verdict is attached
        assert!(paired[0].verdict().is_none());
    }

    #[test]
    fn kind_mismatch_splits_into_two_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let left = temp.path().join("left");
        let right = temp.path().join("right");
        fs::create_dir(&left).expect("mkdir");
        fs::create_dir(&right).expect("mkdir");
        fs::write(left.join("thing"), b"file").expect("write");
        fs::create_dir(right.join("thing")).expect("mkdir");

        let mut errors = 0;
        let paired = pair_entries(scan_dir(&left), scan_dir(&right), None, &mut errors);
        assert_eq!(paired.len(), 2);
        assert!(paired[0].source().is_some() && paired[0].compare().is_none());
        assert!(!paired[0].source().expect("source").is_dir());
        assert!(paired[1].source().is_none() && paired[1].compare().is_some());
        assert!(paired[1].compare().expect("compare").is_dir());
    }

    #[test]
    fn directories_pair_without_verdict() {
        let temp = tempfile::tempdir().expect("tempdir");
        let left = temp.path().join("left");
        let right = temp.path().join("right");
        fs::create_dir_all(left.join("sub")).expect("mkdir");
        fs::create_dir_all(right.join("sub")).expect("mkdir");

        let mut errors = 0;
        let paired = pair_entries(scan_dir(&left), scan_dir(&right), None, &mut errors);
        assert_eq!(paired.len(), 1);
        assert!(paired[0].verdict().is_none());
        assert!(paired[0].source().expect("source").is_dir());
    }
}
