//! Terminal progress bar for long-running plans.

use std::io::{self, Write};

use engine::ProgressSink;

const BAR_WIDTH: usize = 50;

/// Renders a carriage-return progress bar on stderr.
///
/// Redraws only when the displayed percentage changes, so large plans do
/// not drown in terminal writes.
pub struct TerminalProgress {
    total: u64,
    done: u64,
    shown_percent: Option<u8>,
}

impl TerminalProgress {
    /// Creates an idle progress bar.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: 0,
            done: 0,
            shown_percent: None,
        }
    }

    fn render(&mut self) {
        if self.total == 0 {
            return;
        }
        let percent = ((self.done.min(self.total) * 100) / self.total) as u8;
        if self.shown_percent == Some(percent) {
            return;
        }
        self.shown_percent = Some(percent);
        let filled = (usize::from(percent) * BAR_WIDTH) / 100;
        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "\r[{}{}] {percent:3}%",
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled)
        );
        if percent == 100 {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn begin(&mut self, total_weight: u64) {
        self.total = total_weight;
        self.done = 0;
        self.shown_percent = None;
        self.render();
    }

    fn advance(&mut self, weight: u64) {
        self.done += weight;
        self.render();
    }
}
