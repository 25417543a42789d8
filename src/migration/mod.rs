// ABOUTME: Per-database dump and import pipelines
// ABOUTME: Database discovery, gzip streaming with progress, and run timings

pub mod dump;
pub mod progress;
pub mod restore;
pub mod schema;
pub mod timings;

pub use dump::{dump_args, dump_database, DumpTask};
pub use progress::{byte_progress, byte_progress_with};
pub use restore::{import_database, recreate_statement, ImportTask};
pub use schema::{list_databases, parse_database_list};
pub use timings::{Timing, TimingLedger, SLOWEST_REPORTED};
