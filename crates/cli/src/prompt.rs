//! Interactive decisions routed to the terminal.

use std::io::{self, BufRead, Write};
use std::path::Path;

use engine::{format_bytes, DecisionHandler};

/// Asks y/n questions on stderr/stdin.
pub struct ConsolePrompts;

impl ConsolePrompts {
    fn ask(question: &str) -> bool {
        let stdin = io::stdin();
        loop {
            eprint!("{question} (y/n) ");
            let _ = io::stderr().flush();
            let mut answer = String::new();
            if stdin.lock().read_line(&mut answer).is_err() || answer.is_empty() {
                // no interactive input available; decline
                return false;
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" => return true,
                "n" => return false,
                _ => {}
            }
        }
    }
}

impl DecisionHandler for ConsolePrompts {
    fn confirm_drive_full(&mut self, needed: u64, available: u64) -> bool {
        Self::ask(&format!(
            "The target drive has {} free space. The backup is expected to need \
             another {}. Proceed anyway?",
            format_bytes(available),
            format_bytes(needed)
        ))
    }

    fn confirm_source_skip(&mut self, name: &str, dir: &Path) -> bool {
        Self::ask(&format!(
            "The source '{name}' at '{}' is not available. Skip it and continue?",
            dir.display()
        ))
    }
}
