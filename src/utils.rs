// ABOUTME: Utility functions for validation and preflight checks
// ABOUTME: Database name rules, client tool discovery, and human-readable sizes

use crate::mysql::{ClientCommand, ExecutionStrategy, ServerConnection};
use anyhow::{bail, Result};
use which::which;

/// Longest database name the server accepts
pub const MAX_DATABASE_NAME_LEN: usize = 64;

/// Path separators; a database name becomes a file name
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\'];

/// Validate a database name before it is used in a file path or command
///
/// Shell metacharacters, quotes and interior spaces are accepted: local
/// clients get the name as one argument, container lines quote it, and SQL
/// statements backtick-quote it. Database names must:
/// - Be 1-64 characters long
/// - Not start with `-` (it would be read as a client flag)
/// - Not end with a space (the server rejects those)
/// - Contain no control characters, `/` or `\`
///
/// # Examples
///
/// ```
/// # use seren_mysql_dumper::utils::validate_database_name;
/// # use anyhow::Result;
/// # fn example() -> Result<()> {
/// validate_database_name("orders")?;
/// validate_database_name("app$prod")?;
/// validate_database_name("sales 2024")?;
///
/// assert!(validate_database_name("").is_err());
/// assert!(validate_database_name("../etc").is_err());
/// assert!(validate_database_name("--defaults-file=x").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Database name cannot be empty");
    }

    let len = name.chars().count();
    if len > MAX_DATABASE_NAME_LEN {
        bail!(
            "Database name '{}' exceeds maximum length of {} characters (got {})",
            sanitize_identifier(name),
            MAX_DATABASE_NAME_LEN,
            len
        );
    }

    if name.starts_with('-') {
        bail!(
            "Database name '{}' must not start with '-'",
            sanitize_identifier(name)
        );
    }

    if name.ends_with(' ') {
        bail!(
            "Database name '{}' must not end with a space",
            sanitize_identifier(name)
        );
    }

    for (i, c) in name.chars().enumerate() {
        if c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c) {
            bail!(
                "Database name '{}' contains invalid character '{}' at position {}",
                sanitize_identifier(name),
                if c.is_control() {
                    format!("\\x{:02x}", c as u32)
                } else {
                    c.to_string()
                },
                i
            );
        }
    }

    Ok(())
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to prevent log injection.
///
/// # Examples
///
/// ```
/// # use seren_mysql_dumper::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_db"), "normal_db");
/// assert_eq!(sanitize_identifier("db\x00name"), "dbname");
/// assert_eq!(sanitize_identifier("db\nname"), "dbname");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Check that the binaries a run needs are on PATH
///
/// Locally that is the dump and client binaries of the configured dialect;
/// with a container only the container runtime is needed here.
pub fn check_required_tools(conn: &ServerConnection) -> Result<()> {
    let tools: Vec<&str> = match conn.strategy() {
        ExecutionStrategy::Local => {
            let dialect = conn.dialect();
            vec![
                dialect.binary(ClientCommand::Dump),
                dialect.binary(ClientCommand::Query),
            ]
        }
        ExecutionStrategy::Container { runtime, .. } => vec![runtime.as_str()],
    };

    let missing: Vec<&str> = tools
        .into_iter()
        .filter(|tool| which(tool).is_err())
        .collect();

    if !missing.is_empty() {
        match conn.strategy() {
            ExecutionStrategy::Local => bail!(
                "Missing required {} client tools: {}\n\
                 \n\
                 Please install the client tools:\n\
                 - Ubuntu/Debian: sudo apt-get install {}\n\
                 - macOS: brew install {}\n\
                 Or run inside a server container with --container <name>",
                conn.dialect(),
                missing.join(", "),
                conn.dialect().client_package(),
                conn.dialect()
            ),
            ExecutionStrategy::Container { .. } => bail!(
                "Missing container runtime: {}",
                missing.join(", ")
            ),
        }
    }

    Ok(())
}

/// Format bytes into human-readable string
///
/// # Examples
///
/// ```
/// # use seren_mysql_dumper::utils::format_bytes;
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(1073741824), "1.0 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_idx])
}
