// ABOUTME: Top-level dump and import runs over every selected database
// ABOUTME: Defines the backend seam, run cancellation, and the timing report

pub mod dump;
pub mod import;

pub use dump::{dump, dump_all, DumpOptions};
pub use import::{database_name_from_file, import, import_all, ImportOptions};

use crate::migration::{self, DumpTask, ImportTask, TimingLedger};
use crate::mysql::ServerConnection;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Operations a run performs against the server, one database at a time
pub trait DatabaseBackend {
    /// Databases to consider, in server listing order
    fn list_databases(&self) -> Result<Vec<String>>;
    fn dump_database(&self, task: &DumpTask) -> Result<()>;
    fn import_database(&self, task: &ImportTask) -> Result<()>;
}

/// Backend driving the real client binaries
#[derive(Debug)]
pub struct ServerBackend {
    conn: ServerConnection,
}

impl ServerBackend {
    pub fn new(conn: ServerConnection) -> Self {
        Self { conn }
    }
}

impl DatabaseBackend for ServerBackend {
    fn list_databases(&self) -> Result<Vec<String>> {
        migration::list_databases(&self.conn)
    }

    fn dump_database(&self, task: &DumpTask) -> Result<()> {
        migration::dump_database(&self.conn, task)?;
        if let Ok(meta) = std::fs::metadata(&task.path) {
            tracing::info!(
                "✓ {} written ({})",
                task.path.display(),
                crate::utils::format_bytes(meta.len())
            );
        }
        Ok(())
    }

    fn import_database(&self, task: &ImportTask) -> Result<()> {
        migration::import_database(&self.conn, task)?;
        tracing::info!("✓ {} imported", task.database);
        Ok(())
    }
}

/// Run-scoped stop request, checked between databases
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn log_report(verb: &str, ledger: &TimingLedger, elapsed: Duration) {
    tracing::info!("{} {} databases in {:.2?} 👍", verb, ledger.len(), elapsed);
    tracing::info!("{}", ledger.report());
}
