//! Platform-independent "open this file with its default application".

use std::path::Path;
use std::process::Command;

use tracing::warn;

/// Launches the platform opener for `path`, logging on failure.
pub fn open_file(path: &Path) {
    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(path).spawn()
    } else if cfg!(windows) {
        Command::new("cmd").args(["/C", "start", ""]).arg(path).spawn()
    } else {
        Command::new("xdg-open").arg(path).spawn()
    };
    if let Err(io_error) = result {
        warn!("could not open '{}': {io_error}", path.display());
    }
}
