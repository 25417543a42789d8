// ABOUTME: Dump command - writes one gzip file per database on the server
// ABOUTME: Applies lock suppression and table exclusions per database, fails fast

use super::{log_report, DatabaseBackend, ServerBackend};
use crate::filters::DatabaseFilter;
use crate::migration::{DumpTask, TimingLedger};
use crate::mysql::ServerConnection;
use crate::utils::{check_required_tools, validate_database_name};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Dump run settings
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Suppress table locking for every database
    pub no_lock_all: bool,
    /// Databases dumped without table locking
    pub no_lock: Vec<String>,
    pub filter: DatabaseFilter,
}

impl DumpOptions {
    pub fn lock_suppressed(&self, database: &str) -> bool {
        self.no_lock_all || self.no_lock.iter().any(|db| db == database)
    }
}

/// Dump every selected database on the server into `dest`
pub async fn dump(conn: ServerConnection, dest: PathBuf, options: DumpOptions) -> Result<()> {
    check_required_tools(&conn)?;

    tokio::task::spawn_blocking(move || {
        let backend = ServerBackend::new(conn);
        dump_all(&backend, &dest, &options)
    })
    .await
    .context("Dump task panicked")??;

    Ok(())
}

/// Dump databases one after another into `<dest>/<db>.sql.gz`.
///
/// The first failing database aborts the run; files already written stay.
pub fn dump_all(
    backend: &dyn DatabaseBackend,
    dest: &Path,
    options: &DumpOptions,
) -> Result<TimingLedger> {
    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    let databases: Vec<String> = backend
        .list_databases()?
        .into_iter()
        .filter(|db| options.filter.should_include_database(db))
        .collect();

    for db in &databases {
        validate_database_name(db)
            .with_context(|| format!("Refusing to dump database '{}'", db))?;
    }
    tracing::info!("Found {} databases", databases.len());

    let started = Instant::now();
    let mut ledger = TimingLedger::new();
    for database in databases {
        let task = DumpTask {
            path: dest.join(format!("{}.sql.gz", database)),
            lock_suppressed: options.lock_suppressed(&database),
            ignore_tables: options.filter.excluded_tables_for(&database),
            database,
        };

        let db_started = Instant::now();
        backend.dump_database(&task)?;
        ledger.record(task.database, db_started.elapsed());
    }

    log_report("Dumped", &ledger, started.elapsed());
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_suppressed_by_list() {
        let options = DumpOptions {
            no_lock: vec!["analytics".to_string()],
            ..Default::default()
        };
        assert!(options.lock_suppressed("analytics"));
        assert!(!options.lock_suppressed("orders"));
    }

    #[test]
    fn test_lock_suppressed_globally() {
        let options = DumpOptions {
            no_lock_all: true,
            ..Default::default()
        };
        assert!(options.lock_suppressed("orders"));
        assert!(options.lock_suppressed("mysql"));
    }
}
