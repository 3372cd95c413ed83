//! Static HTML rendering of a persisted plan.

use std::fs;
use std::io;
use std::path::Path;

use engine::{format_bytes, Action, ActionRecord, ActionTag};

const PAGE_STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; }\n\
h2 { border-bottom: 1px solid #ccc; padding-bottom: 0.2em; }\n\
table { border-collapse: collapse; width: 100%; }\n\
th, td { text-align: left; padding: 0.25em 0.75em; border-bottom: 1px solid #eee; }\n\
tr.copy td.action { color: #1a7f37; }\n\
tr.hardlink td.action { color: #0969da; }\n\
tr.delete td.action { color: #cf222e; }\n";

/// Writes the plan as a browsable HTML table, skipping excluded action
/// types.
///
/// # Errors
///
/// Returns the underlying I/O error when the file cannot be written.
pub fn write_action_html(
    record: &ActionRecord,
    excluded: &[ActionTag],
    path: &Path,
) -> io::Result<()> {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<title>Backup actions</title>\n<style>\n");
    page.push_str(PAGE_STYLE);
    page.push_str("</style>\n</head>\n<body>\n");
    page.push_str(&format!(
        "<h1>Backup actions for {}</h1>\n",
        escape(&record.instance_dir.display().to_string())
    ));

    for source in &record.sources {
        page.push_str(&format!("<h2>{}</h2>\n", escape(&source.name)));
        page.push_str("<table>\n<tr><th>Action</th><th>Path</th><th>Size</th></tr>\n");
        for action in source
            .actions
            .iter()
            .filter(|action| !excluded.contains(&action.tag()))
        {
            let size = match action {
                Action::Copy { size, .. } | Action::Hardlink { size, .. } => {
                    format_bytes(*size)
                }
                _ => String::new(),
            };
            page.push_str(&format!(
                "<tr class=\"{tag}\"><td class=\"action\">{tag}</td><td>{path}</td><td>{size}</td></tr>\n",
                tag = action.tag().as_str(),
                path = escape(&action.relpath().to_slash_string()),
            ));
        }
        page.push_str("</table>\n");
    }
    page.push_str("</body>\n</html>\n");
    fs::write(path, page)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
