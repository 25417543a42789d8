// ABOUTME: Dumps one database through the dump client into a gzip file
// ABOUTME: Streams client stdout via a progress counter into the compressor

use super::progress::byte_progress;
use crate::mysql::{ClientCommand, ServerConnection};
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One database to dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpTask {
    pub database: String,
    /// Destination, `<dir>/<database>.sql.gz`
    pub path: PathBuf,
    /// Add `--lock-tables=false`
    pub lock_suppressed: bool,
    /// Tables skipped by the dump, as `database.table`
    pub ignore_tables: Vec<String>,
}

/// Arguments passed to the dump client for `task`.
///
/// `--single-transaction` and `--quick` are always present, the database name
/// is always last.
pub fn dump_args(task: &DumpTask) -> Vec<String> {
    let mut args = vec!["--single-transaction".to_string(), "--quick".to_string()];
    if task.lock_suppressed {
        args.push("--lock-tables=false".to_string());
    }
    for table in &task.ignore_tables {
        args.push(format!("--ignore-table={}", table));
    }
    args.push(task.database.clone());
    args
}

/// Dump one database into a gzip file.
///
/// The destination is truncated first. On failure the partial file stays on
/// disk; cleanup is left to the caller. Returns the uncompressed size.
pub fn dump_database(conn: &ServerConnection, task: &DumpTask) -> Result<u64> {
    tracing::info!(
        "Dumping {} -> {} (lock: {})",
        task.database,
        task.path.display(),
        !task.lock_suppressed
    );

    let invocation = conn
        .command(ClientCommand::Dump, dump_args(task))
        .for_database(&task.database);

    let written = write_gzip_file(&task.path, &task.database, |sink| {
        invocation.run_with_output(sink)
    })
    .with_context(|| format!("Failed to dump database '{}'", task.database))?;

    tracing::debug!("{} dumped {} uncompressed bytes", task.database, written);
    Ok(written)
}

/// Create `path` and hand `produce` a gzip writer counting into a progress bar.
///
/// The compressor is finished and the file flushed only if `produce` succeeds;
/// on error both are still dropped and closed.
pub(crate) fn write_gzip_file<F>(path: &Path, label: &str, produce: F) -> Result<u64>
where
    F: FnOnce(&mut dyn Write) -> Result<u64>,
{
    let file =
        File::create(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

    let progress = byte_progress(label);
    let written = {
        let mut sink = progress.wrap_write(&mut encoder);
        produce(&mut sink)
    };
    progress.finish_and_clear();
    let written = written?;

    let mut writer = encoder
        .finish()
        .with_context(|| format!("Failed to finish compressing {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(written)
}
