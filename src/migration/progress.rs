// ABOUTME: Live byte-count readout for streaming dumps and imports
// ABOUTME: Hidden pass-through bar when stdout is not an interactive terminal

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

const TEMPLATE: &str = "{prefix:.bold} {bytes} @ {binary_bytes_per_sec} [{elapsed}]";

/// Progress bar for a stream of unknown length, drawn only when stdout is a terminal
pub fn byte_progress(label: &str) -> ProgressBar {
    byte_progress_with(std::io::stdout().is_terminal(), label)
}

/// Same as [`byte_progress`] with the terminal check decided by the caller.
///
/// A hidden bar still counts bytes, so wrapped readers and writers behave the
/// same either way.
pub fn byte_progress_with(interactive: bool, label: &str) -> ProgressBar {
    if !interactive {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::no_length();
    match ProgressStyle::with_template(TEMPLATE) {
        Ok(style) => bar.set_style(style),
        Err(e) => tracing::debug!("Invalid progress template: {}", e),
    }
    bar.set_prefix(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(250));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_hidden_bar_passes_writes_through_and_counts() {
        let bar = byte_progress_with(false, "orders");
        let mut out = Vec::new();
        {
            let mut writer = bar.wrap_write(&mut out);
            writer.write_all(b"INSERT INTO t VALUES (1);\n").unwrap();
        }

        assert_eq!(out, b"INSERT INTO t VALUES (1);\n");
        assert_eq!(bar.position(), 26);
    }

    #[test]
    fn test_hidden_bar_passes_reads_through_and_counts() {
        let bar = byte_progress_with(false, "orders");
        let mut reader = bar.wrap_read(&b"CREATE TABLE t (id INT);"[..]);
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();

        assert_eq!(text, "CREATE TABLE t (id INT);");
        assert_eq!(bar.position(), 24);
    }
}
