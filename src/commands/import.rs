// ABOUTME: Import command - restores every <db>.sql.gz file in a directory
// ABOUTME: Skips introspection schemas and, unless asked, the mysql schema

use super::{log_report, Cancellation, DatabaseBackend, ServerBackend};
use crate::filters::DatabaseFilter;
use crate::migration::{ImportTask, TimingLedger};
use crate::mysql::{is_introspection_schema, ServerConnection, SYSTEM_SCHEMA};
use crate::utils::{check_required_tools, validate_database_name};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const DUMP_SUFFIX: &str = ".sql.gz";

/// Import run settings
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Also import the `mysql` schema (users, privileges)
    pub include_mysql: bool,
    /// Keep existing databases instead of dropping them first
    pub no_drop: bool,
    pub filter: DatabaseFilter,
}

/// Database name encoded in a dump file name.
///
/// The suffix is matched at the end only, so `a.sql.gz.sql.gz` belongs to
/// database `a.sql.gz`.
///
/// # Examples
///
/// ```
/// # use seren_mysql_dumper::commands::database_name_from_file;
/// assert_eq!(database_name_from_file("orders.sql.gz"), Some("orders"));
/// assert_eq!(database_name_from_file("a.sql.gz.sql.gz"), Some("a.sql.gz"));
/// assert_eq!(database_name_from_file("notadump.txt"), None);
/// assert_eq!(database_name_from_file(".sql.gz"), None);
/// ```
pub fn database_name_from_file(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(DUMP_SUFFIX)
        .filter(|name| !name.is_empty())
}

/// Import every dump file in `src`, stopping early on Ctrl-C
pub async fn import(
    conn: ServerConnection,
    src: PathBuf,
    options: ImportOptions,
    cancel: Cancellation,
) -> Result<()> {
    check_required_tools(&conn)?;

    tokio::task::spawn_blocking(move || {
        let backend = ServerBackend::new(conn);
        import_all(&backend, &src, &options, &cancel)
    })
    .await
    .context("Import task panicked")??;

    Ok(())
}

/// Import dump files from `src` in directory listing order.
///
/// Cancellation is checked before each file; a cancelled run returns the
/// databases imported so far without error. The first failing database
/// aborts the run.
pub fn import_all(
    backend: &dyn DatabaseBackend,
    src: &Path,
    options: &ImportOptions,
    cancel: &Cancellation,
) -> Result<TimingLedger> {
    let entries =
        fs::read_dir(src).with_context(|| format!("Failed to read directory {}", src.display()))?;

    if options.include_mysql {
        tracing::warn!(
            "Importing the {} schema is only safe between servers of the same version",
            SYSTEM_SCHEMA
        );
    }

    let started = Instant::now();
    let mut ledger = TimingLedger::new();
    for entry in entries {
        if cancel.is_cancelled() {
            tracing::info!(
                "Import cancelled after {} database(s); remaining files left untouched",
                ledger.len()
            );
            return Ok(ledger);
        }

        let entry = entry
            .with_context(|| format!("Failed to read directory contents of {}", src.display()))?;
        let path = entry.path();

        let file_name = entry.file_name();
        let Some(database) = file_name.to_str().and_then(database_name_from_file) else {
            tracing::debug!("Ignoring file {}", path.display());
            continue;
        };
        if !path.is_file() {
            tracing::debug!("Ignoring non-file {}", path.display());
            continue;
        }

        if is_introspection_schema(database) {
            tracing::debug!("Ignoring {} schema", database);
            continue;
        }
        if database == SYSTEM_SCHEMA && !options.include_mysql {
            tracing::debug!("Ignoring {} schema", SYSTEM_SCHEMA);
            continue;
        }
        if !options.filter.should_include_database(database) {
            tracing::debug!("Skipping {} (filtered)", database);
            continue;
        }
        if let Err(e) = validate_database_name(database) {
            tracing::warn!("Skipping {}: {}", path.display(), e);
            continue;
        }

        let task = ImportTask {
            database: database.to_string(),
            path,
            drop_suppressed: options.no_drop,
        };

        let db_started = Instant::now();
        backend.import_database(&task)?;
        ledger.record(task.database, db_started.elapsed());
    }

    log_report("Imported", &ledger, started.elapsed());
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_file() {
        assert_eq!(database_name_from_file("orders.sql.gz"), Some("orders"));
        assert_eq!(database_name_from_file("a.sql.gz.sql.gz"), Some("a.sql.gz"));
        assert_eq!(database_name_from_file("orders.sql.gz.bak"), None);
        assert_eq!(database_name_from_file("orders.sql"), None);
        assert_eq!(database_name_from_file("notadump.txt"), None);
        assert_eq!(database_name_from_file(".sql.gz"), None);
    }
}
