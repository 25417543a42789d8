// ABOUTME: Imports one gzip dump file into a database via the client binary
// ABOUTME: Recreates the target database first unless it is a reserved schema

use super::progress::byte_progress;
use crate::mysql::{is_reserved_schema, ClientCommand, ServerConnection};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

pub const CHARACTER_SET: &str = "utf8mb4";
pub const COLLATION: &str = "utf8mb4_unicode_ci";

/// One dump file to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTask {
    pub database: String,
    /// Source, `<dir>/<database>.sql.gz`
    pub path: PathBuf,
    /// Keep the existing database instead of dropping it first
    pub drop_suppressed: bool,
}

/// Statement that (re)creates `database`, or `None` for reserved schemas,
/// which already exist on every server.
pub fn recreate_statement(database: &str, drop_suppressed: bool) -> Option<String> {
    if is_reserved_schema(database) {
        return None;
    }

    let quoted = quote_identifier(database);
    let mut sql = String::new();
    if !drop_suppressed {
        sql.push_str(&format!("DROP DATABASE IF EXISTS {}; ", quoted));
    }
    sql.push_str(&format!(
        "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET {} COLLATE {};",
        quoted, CHARACTER_SET, COLLATION
    ));
    Some(sql)
}

/// Backtick-quote an identifier, doubling embedded backticks
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Import one dump file.
///
/// No partial-import detection or rollback: whatever the statements in the
/// file committed before a failure stays committed. Returns the
/// uncompressed size streamed.
pub fn import_database(conn: &ServerConnection, task: &ImportTask) -> Result<u64> {
    tracing::info!("Importing {} -> {}", task.path.display(), task.database);

    match recreate_statement(&task.database, task.drop_suppressed) {
        Some(sql) => conn
            .command(ClientCommand::Query, vec!["-e".to_string(), sql])
            .for_database(&task.database)
            .run()
            .with_context(|| format!("Failed to create database '{}'", task.database))?,
        None => tracing::debug!(
            "Not recreating reserved schema '{}'",
            task.database
        ),
    }

    let invocation = conn
        .command(ClientCommand::Import, vec![task.database.clone()])
        .for_database(&task.database);

    let read = read_gzip_file(&task.path, &task.database, |source| {
        invocation.run_with_input(source)
    })
    .with_context(|| format!("Failed to import database '{}'", task.database))?;

    tracing::debug!("{} imported {} uncompressed bytes", task.database, read);
    Ok(read)
}

/// Open `path` and hand `consume` a decompressing reader counting into a progress bar
pub(crate) fn read_gzip_file<F>(path: &Path, label: &str, consume: F) -> Result<u64>
where
    F: FnOnce(&mut dyn Read) -> Result<u64>,
{
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let decoder = GzDecoder::new(BufReader::new(file));

    let progress = byte_progress(label);
    let mut source = progress.wrap_read(decoder);
    let result = consume(&mut source);
    progress.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_recreate_statement_drops_then_creates() {
        assert_eq!(
            recreate_statement("orders", false).unwrap(),
            "DROP DATABASE IF EXISTS `orders`; \
             CREATE DATABASE IF NOT EXISTS `orders` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;"
        );
    }

    #[test]
    fn test_recreate_statement_without_drop() {
        let sql = recreate_statement("orders", true).unwrap();
        assert!(!sql.contains("DROP DATABASE"));
        assert!(sql.starts_with("CREATE DATABASE IF NOT EXISTS `orders`"));
    }

    #[test]
    fn test_recreate_statement_escapes_backticks() {
        let sql = recreate_statement("we`ird", true).unwrap();
        assert!(sql.starts_with("CREATE DATABASE IF NOT EXISTS `we``ird` "));
    }

    #[test]
    fn test_recreate_statement_skips_reserved_schemas() {
        for name in ["mysql", "information_schema", "performance_schema"] {
            assert!(recreate_statement(name, false).is_none());
            assert!(recreate_statement(name, true).is_none());
        }
    }

    #[test]
    fn test_read_gzip_file_decompresses_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.sql.gz");
        gzip_file(&path, b"INSERT INTO t VALUES (1);\n");

        let mut received = Vec::new();
        let read = read_gzip_file(&path, "orders", |source| {
            Ok(std::io::copy(source, &mut received)?)
        })
        .unwrap();

        assert_eq!(read, 26);
        assert_eq!(received, b"INSERT INTO t VALUES (1);\n");
    }

    #[test]
    fn test_read_gzip_file_rejects_non_gzip_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.sql.gz");
        std::fs::write(&path, "not gzip at all").unwrap();

        let result = read_gzip_file(&path, "plain", |source| {
            Ok(std::io::copy(source, &mut std::io::sink())?)
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_read_gzip_file_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_gzip_file(&dir.path().join("nope.sql.gz"), "nope", |_| Ok(0))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }

    fn gzip_file(path: &Path, contents: &[u8]) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(contents).unwrap();
        encoder.finish().unwrap();
    }

    /// Import `database` through a runtime that logs each shell line it is given
    #[cfg(unix)]
    fn import_with_logging_runtime(database: &str, drop_suppressed: bool) -> (Vec<String>, String) {
        use crate::mysql::test_support::{fake_runtime, runtime_connection};

        let dir = tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let received = dir.path().join("stdin.sql");
        let runtime = fake_runtime(
            dir.path(),
            &format!(
                "printf '%s\\n' \"$6\" >> '{}'\ncat >> '{}'",
                log.display(),
                received.display()
            ),
        );
        let conn = runtime_connection(&runtime);
        let path = dir.path().join(format!("{}.sql.gz", database));
        gzip_file(&path, b"CREATE TABLE t (id INT);\n");

        import_database(
            &conn,
            &ImportTask {
                database: database.to_string(),
                path,
                drop_suppressed,
            },
        )
        .unwrap();

        let calls = std::fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        let stdin = std::fs::read_to_string(&received).unwrap_or_default();
        (calls, stdin)
    }

    #[cfg(unix)]
    #[test]
    fn test_import_recreates_database_before_bulk_import() {
        let (calls, stdin) = import_with_logging_runtime("orders", false);

        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("mysql -uroot -ppw -e 'DROP DATABASE IF EXISTS `orders`; CREATE DATABASE"));
        assert_eq!(calls[1], "mysql -uroot -ppw orders");
        assert_eq!(stdin, "CREATE TABLE t (id INT);\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_import_without_drop_only_creates() {
        let (calls, _) = import_with_logging_runtime("orders", true);

        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("mysql -uroot -ppw -e 'CREATE DATABASE IF NOT EXISTS `orders`"));
        assert_eq!(calls[1], "mysql -uroot -ppw orders");
    }

    #[cfg(unix)]
    #[test]
    fn test_import_of_reserved_schema_issues_no_query() {
        for name in ["mysql", "information_schema", "performance_schema"] {
            let (calls, stdin) = import_with_logging_runtime(name, false);

            assert_eq!(calls, vec![format!("mysql -uroot -ppw {}", name)]);
            assert_eq!(stdin, "CREATE TABLE t (id INT);\n");
        }
    }
}
